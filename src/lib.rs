//! # Pipeline Core
//!
//! Lane and ticket ordering for multi-tenant sales pipelines.
//!
//! A pipeline is a board of ordered lanes, each holding ordered tickets.
//! [`PipelineStore`] reads boards scoped to the caller's tenant,
//! [`ReorderCoordinator`] persists drag-and-drop results and other edits in
//! single transactions, and [`project_board`] turns a board into lane columns
//! with value totals. Persistence is pluggable through [`Storage`].

pub mod activity;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod modal;
pub mod projector;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use activity::{ActivityEntry, ActivitySink, MemoryActivitySink, TracingActivitySink};
pub use config::CoordinatorConfig;
pub use coordinator::ReorderCoordinator;
pub use domain::{
    Board, DensityPolicy, Identity, Lane, LaneDetail, LaneId, Money, Pipeline, PipelineId, Tag,
    TenantId, Ticket, TicketDetail, TicketDraft, TicketId, TicketOrderChange, UserId,
};
pub use error::{ErrorKind, PipelineError, Result};
pub use modal::ModalContext;
pub use projector::{project_board, BoardView, LaneView, ViewProjector};
pub use storage::{MemoryStorage, Storage};
pub use store::PipelineStore;
