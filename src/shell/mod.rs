//! Interactive command session: masked credential collection for `su`,
//! prompt rendering, bounded history and dispatch to an interpreter.

mod builtins;
mod history;
mod interpreter;
mod prompt;
mod session;

pub use builtins::{resolve_path, Builtins};
pub use history::{History, HISTORY_LIMIT};
pub use interpreter::{CommandContext, CommandInterpreter, CommandOutput, DataFacade};
pub use prompt::{abbreviate_home, render_prompt};
pub use session::{
    parse_su, CommandSession, LineKind, PendingAction, PendingKind, Response, SessionState, SuRequest,
    TranscriptLine, MASK_CHAR, SECRET_PROMPT,
};
