pub mod board;
pub mod ids;
pub mod money;
pub mod ordering;
pub mod pipeline;
pub mod tag;
pub mod ticket;

pub use board::{Board, LaneDetail, TicketDetail, TicketMove};
pub use ids::{ContactId, Identity, LaneId, PipelineId, TagId, TenantId, TicketId, UserId};
pub use money::Money;
pub use ordering::{DensityPolicy, TicketOrderChange};
pub use pipeline::{Lane, Pipeline};
pub use tag::{Contact, ContactSummary, Tag};
pub use ticket::{Ticket, TicketDraft};
