//! `ezreq`: an HTTP session that remembers where it is.
//!
//! Relative targets (`/path`, `page`, `?k=v`, `//host/path`) are resolved
//! against the session's current base URL, and `origin`/`referer` headers are
//! derived from the previously visited page:
//!
//! | verb    | `origin` | `referer` |
//! |---------|----------|-----------|
//! | `get`   | no       | yes       |
//! | `post`  | yes      | no        |
//! | `visit` | no       | no        |
//!
//! ```no_run
//! # async fn demo() -> ezreq::Result<()> {
//! let mut session = ezreq::Session::new("https://example.com")?;
//! let feed = session.get("/?page=rss").await?; // referer: https://example.com
//! let login = session
//!     .post_with("/login", |req| req.body("user=me"))
//!     .await?; // origin: https://example.com
//! # let _ = (feed, login);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod resolver;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use resolver::{Resolution, ResolverState};
pub use session::{Session, Verb};
pub use transport::Transport;
