mod preferences;
mod schema;
mod state;
mod types;

pub use schema::Database;
pub use types::{
    DatabaseError, CHAT_HISTORY_CAP, KEY_API_KEY, KEY_CHAT_HISTORY, KEY_FEED_SOURCES,
};
