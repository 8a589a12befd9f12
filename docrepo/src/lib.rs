//! # docrepo - Typed repositories over a document store
//!
//! docrepo gives every document type a uniform CRUD surface on top of a document store
//! client. The store itself (connections, query execution, wire encoding) stays behind the
//! traits in [`store`]; this crate decides when to call it and how to shape the inputs.
//!
//! ## Key Features
//!
//! - **Typed repositories**: [`repository::Repository<T>`] binds one document type to one
//!   collection
//! - **Lifecycle hooks**: `before_insert`, `after_insert`, `before_update`, `after_update`
//!   and `after_find` on [`repository::Entity`], with identifier and timestamp defaults
//!   from [`repository::DefaultFields`]
//! - **Typed or raw filters**: pass a partially populated value or a raw [`common::Document`]
//! - **Compact index definitions**: `"name,-age"` compiles to a compound index
//! - **Transactions**: [`transaction::Transactor`] scopes a callback in a store session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docrepo::common::Context;
//! use docrepo::doc;
//! use docrepo::repository::{DefaultFields, Entity, Query, Repository};
//! use docrepo_derive::Convertible;
//!
//! #[derive(Default, Convertible)]
//! struct User {
//!     #[converter(flatten)]
//!     meta: DefaultFields,
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Entity for User {
//!     fn default_fields(&mut self) -> Option<&mut DefaultFields> {
//!         Some(&mut self.meta)
//!     }
//! }
//!
//! let ctx = Context::background();
//! let users: Repository<User> = Repository::new(client_collection);
//!
//! let mut user = User { name: "ada".into(), age: 36, ..Default::default() };
//! users.insert_one(&ctx, &mut user)?;
//!
//! let adults = users.find(&ctx, doc! { age: { "$gte": 18 } })?;
//! let ada = users.find_one(&ctx, Query::Typed(User { name: "ada".into(), ..Default::default() }))?;
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Document model, value conversion, identifiers and the request context
//! - [`errors`] - Error type and result alias
//! - [`index`] - Index models and the index expression compiler
//! - [`repository`] - The typed repository engine and the entity contract
//! - [`store`] - Traits a document store client implements
//! - [`transaction`] - Transaction orchestration

pub mod common;
pub mod errors;
pub mod index;
pub mod repository;
pub mod store;
pub mod transaction;
