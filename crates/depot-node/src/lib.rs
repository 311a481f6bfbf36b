//! # Depot Node
//!
//! HTTP node for Depot, a self-hosted Git and Git LFS service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        HTTP API                          │
//! │  repositories · collaborators · pull requests · LFS      │
//! └──────────────────────────────────────────────────────────┘
//!        │                │                    │
//!  RepositoryManager  PullRequestService  ObjectCoordinator
//!  CollaboratorRegistry                   LockManager
//!        │                │                    │
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  AccessEvaluator · metadata stores · bare repos · blobs   │
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The caller is identified by the `x-depot-user` header; requests without
//! it are anonymous and may only read public repositories.
//!
//! ## Quick Start
//!
//! ```bash
//! cargo run --bin depot-node -- --api-addr 127.0.0.1:8080 --data-dir ./data
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Application state, error mapping and router
//! - [`repo_api`] - Repository and collaborator endpoints
//! - [`collaboration_api`] - Pull request endpoints
//! - [`lfs_api`] - Git LFS batch, verify, locking and transfer endpoints
//! - [`config`] - Node configuration
//! - [`observability`] - Structured logging
//!
//! ## Example: Building the Router
//!
//! ```rust,no_run
//! use depot_node::api::{create_router, AppState};
//! use depot_node::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let app = create_router(AppState::from_config(&config)?);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod collaboration_api;
pub mod config;
pub mod lfs_api;
pub mod observability;
pub mod repo_api;
