//! Pool options applied uniformly to every sqlx backend.

use crate::ConnectOpts;

pub(crate) trait ApplyPoolOpts {
    fn apply(self, opts: &ConnectOpts) -> Self;
}

macro_rules! impl_apply_pool_opts {
    ($pool_options:ty) => {
        impl ApplyPoolOpts for $pool_options {
            fn apply(mut self, opts: &ConnectOpts) -> Self {
                if let Some(n) = opts.max_conns {
                    self = self.max_connections(n);
                }
                if let Some(n) = opts.min_conns {
                    self = self.min_connections(n);
                }
                if let Some(t) = opts.acquire_timeout {
                    self = self.acquire_timeout(t);
                }
                // idle/lifetime are always forwarded so `None` can disable reaping
                self.idle_timeout(opts.idle_timeout)
                    .max_lifetime(opts.max_lifetime)
            }
        }
    };
}

#[cfg(feature = "pg")]
impl_apply_pool_opts!(sqlx::postgres::PgPoolOptions);

#[cfg(feature = "sqlite")]
impl_apply_pool_opts!(sqlx::sqlite::SqlitePoolOptions);
