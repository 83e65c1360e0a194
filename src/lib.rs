//! # Paper Sync
//!
//! Client-side synchronization and bulk ingestion for a remote corpus of
//! research papers.
//!
//! The remote store owns chunk identity (content hashes) and search
//! ranking. This crate keeps a local snapshot of the catalog, derives the
//! grouped and paginated views users browse, reconciles external search
//! results against the snapshot, and pushes documents to the store one at a
//! time or from a zip archive.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │    CLI     │──▶│ PaperManager │──▶│  PaperStore  │──▶ remote REST API
//! │  (papers)  │   │  actions +   │   │ HTTP/Memory  │
//! └────────────┘   │ notifications│   └──────────────┘
//!                  └──────┬───────┘
//!         ┌───────────────┼────────────────┐
//!         ▼               ▼                ▼
//!   ┌──────────┐   ┌────────────┐   ┌────────────┐
//!   │ catalog  │   │   search   │   │   ingest   │
//!   │+paginate │   │ +selection │   │  (zip)     │
//!   └──────────┘   └────────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! papers list --per-page 12
//! papers search "fetal heart rate" --max-results 20 --select <hash>
//! papers upload ./study.pdf --title "Study"
//! papers ingest ./papers.zip
//! papers remove <hash> --yes
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Wire and domain types |
//! | [`error`] | Error taxonomy and HTTP status mapping |
//! | [`store`] | Remote store trait, HTTP and in-memory implementations |
//! | [`catalog`] | Catalog snapshot, filtering, grouping, ordering |
//! | [`pagination`] | Group pages and per-group chunk pages |
//! | [`search`] | Search annotation and selection |
//! | [`upload`] | Single-document upload and form state |
//! | [`ingest`] | Zip archive bulk ingestion |
//! | [`prefill`] | Clinical form pre-fill from CSV |
//! | [`progress`] | Ingestion progress reporting |
//! | [`notify`] | User-visible notifications |
//! | [`manager`] | Action orchestration |

pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod manager;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod prefill;
pub mod progress;
pub mod search;
pub mod store;
pub mod upload;
