#![doc = "blogger2hugo: convert a Blogger Atom export into Hugo content bundles."]

//! This crate contains the whole conversion pipeline: Atom entry parsing,
//! slug/alias mapping, HTML-to-Markdown conversion, per-post image download
//! and content-bundle emission, plus the CLI wired on top of it.

pub mod archive;
pub mod cli;
pub mod config;
pub mod convert;
pub mod emit;
pub mod images;
pub mod markdown;
pub mod slug;
