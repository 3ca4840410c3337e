// Moderation infrastructure - warnings and anti-spam state

mod sqlite_spam_store;
mod sqlite_warn_store;

pub use sqlite_spam_store::SqliteSpamStore;
pub use sqlite_warn_store::SqliteWarnStore;
