use std::fmt::Write;

use crate::contract::model::User;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full "All Users" page: create form followed by the user list.
pub fn render_index(users: &[User]) -> String {
    let mut list = String::new();
    if users.is_empty() {
        list.push_str("    <p>No users!</p>\n");
    } else {
        list.push_str("    <ul>\n");
        for user in users {
            // writing into a String cannot fail
            let _ = writeln!(
                list,
                "      <li><strong>{}</strong> &lt;{}&gt;</li>",
                escape_html(&user.username),
                escape_html(&user.email)
            );
        }
        list.push_str("    </ul>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <title>All Users</title>
</head>
<body>
  <h1>All Users</h1>
  <form action="/" method="POST">
    <input name="username" type="text" placeholder="Enter a username" required>
    <input name="email" type="email" placeholder="Enter an email address" required>
    <input type="submit" value="Submit">
  </form>
  <hr>
  <section>
{list}  </section>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::UserId;

    fn user(id: i32, username: &str, email: &str) -> User {
        User {
            id: UserId(id),
            username: username.into(),
            email: email.into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn empty_list_says_no_users() {
        let html = render_index(&[]);
        assert!(html.contains("<h1>All Users</h1>"));
        assert!(html.contains("<p>No users!</p>"));
        assert!(!html.contains("<ul>"));
    }

    #[test]
    fn users_are_listed_in_given_order() {
        let html = render_index(&[
            user(1, "michael", "michael@mherman.org"),
            user(2, "fletcher", "fletcher@notreal.com"),
        ]);
        assert!(!html.contains("No users!"));
        let first = html.find("michael").unwrap();
        let second = html.find("fletcher").unwrap();
        assert!(first < second);
    }

    #[test]
    fn user_text_is_escaped() {
        let html = render_index(&[user(1, "<script>alert(1)</script>", "a&b@example.com")]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("a&amp;b@example.com"));
    }

    #[test]
    fn escape_covers_quotes() {
        assert_eq!(escape_html(r#"" ' < > &"#), "&quot; &#x27; &lt; &gt; &amp;");
    }
}
