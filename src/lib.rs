//! # drivescribe
//!
//! Keeps AI-generated folder description files in sync with a remote drive.
//!
//! Each run polls the drive's change-delta stream from a persisted cursor,
//! resolves which folders were affected, regenerates one Markdown
//! description artifact per folder (one-line AI summary per file plus a
//! folder classification), writes the artifacts back, and only then commits
//! the new cursor. Per-file summaries are cached by content hash so
//! unchanged files never hit the AI provider twice.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌───────────────┐   ┌──────────────┐
//! │ RemoteStore │──▶│ ChangeFetcher  │──▶│  Pipeline     │
//! │ (Graph API) │   │ + loop guard  │   │ resolve/list │
//! └─────────────┘   └───────────────┘   └──────┬───────┘
//!                                              │
//!                      ┌───────────────────────┤
//!                      ▼                       ▼
//!                ┌────────────┐         ┌────────────┐
//!                │ Summarizer │         │ state dir  │
//!                │ (Anthropic)│         │ cursor+cache│
//!                └────────────┘         └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Change-stream and listing data types |
//! | [`error`] | Run-error taxonomy |
//! | [`remote`] | Remote drive trait and Graph client |
//! | [`delta`] | Change fetching and loop prevention |
//! | [`cursor`] | Change-cursor persistence |
//! | [`cache`] | Content-addressed summary cache |
//! | [`summarizer`] | AI summarization provider |
//! | [`extract`] | .docx text extraction |
//! | [`artifact`] | Artifact generation and serialization |
//! | [`throttle`] | Provider-call rate gating |
//! | [`pipeline`] | Run orchestration and commit protocol |

pub mod artifact;
pub mod cache;
pub mod config;
pub mod cursor;
pub mod delta;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod remote;
pub mod summarizer;
pub mod throttle;
