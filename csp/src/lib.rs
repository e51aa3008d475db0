pub mod language;
pub mod query;
pub mod scanner;

pub use language::{CommandTemplate, Language, LanguageRegistry, ModeHooks};
pub use query::QueryParams;
pub use scanner::{Block, Event, Scanner};
