pub mod account;
pub mod audit;
pub mod catalog;
pub mod entry;
pub mod migration;
pub mod session;

pub use account::{Account, DomainRecord, Group, NewAccount, Protocol};
pub use audit::{LogRecord, LogStatus, NewLog};
pub use catalog::{
    CaptchaKeyInput, CaptchaKeyStatus, ConfigEntry, ConfigInput, DomainInput, GroupInput,
    PanelDomain, PanelDomainInput,
};
pub use entry::{EntryPatch, EntrySpec, PlaylistEntry, PlaylistSnapshot, DEFAULT_PLAYLIST_TYPE};
pub use migration::{
    AccountOutcome, AccountSessionStatus, Analysis, BulkPreview, MigrationReport, OutcomeStatus,
    UrlPreview,
};
pub use session::{ApiResponse, LoginOutcome, Session, SessionProof, SessionSummary};
