pub mod accounts;
pub mod domain;
pub mod error;
pub mod guard;
pub mod interactions;
pub mod login;
pub mod memory;
pub mod ports;
pub mod session;

pub use accounts::AccountResolver;
pub use domain::{
    AuthorSummary, Comment, Reaction, ReactionKind, RemoteProfile, Snippet, SnippetDraft, User,
};
pub use error::{DomainError, DomainResult};
pub use guard::AccessGuard;
pub use interactions::{InteractionEngine, ReactionChange};
pub use login::{LoginFlow, LoginOutcome};
pub use ports::{IdentityProvider, PortError, PortResult, SnippetStore, UserStore};
pub use session::SessionIssuer;
