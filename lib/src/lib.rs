// BEGIN - Embark standard lints v0.4
// do not change or add/remove here, but one can add exceptions after this section
// for more info see: <https://github.com/EmbarkStudios/rust-ecosystem/issues/59>
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::float_cmp_const,
    clippy::fn_params_excessive_bools,
    clippy::if_let_mutex,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::linkedlist,
    clippy::lossy_float_literal,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_on_vec_items,
    clippy::match_same_arms,
    clippy::match_wildcard_for_single_variants,
    clippy::mem_forget,
    clippy::mismatched_target_os,
    clippy::mut_mut,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::path_buf_push_overwrite,
    clippy::ptr_as_ptr,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_functions_in_if_condition,
    clippy::semicolon_if_nothing_returned,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_to_string,
    clippy::todo,
    clippy::trait_duplication_in_bounds,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::useless_transmute,
    clippy::verbose_file_reads,
    clippy::zero_sized_map_values,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]
// END - Embark standard lints v0.4

//! `painting-restoration` digitally restores photographs of damaged paintings.
//!
//! A photograph goes through three independent stages:
//!
//! 1. An [`EdgeDetector`] extracts a line drawing of the painting's structure
//! 2. A [`Restorer`] runs a context encoder, a convolutional autoencoder
//!    trained to fill in missing regions, over the photograph
//! 3. An [`Enhancer`] boosts the contrast, saturation and sharpness of the
//!    restored image
//!
//! The [`Pipeline`] bundles the three together. The model is trained with a
//! [`Trainer`] on real or [`SyntheticArt`] images.
//!
//! ## Usage
//!
//! ```no_run
//! use painting_restoration as pr;
//!
//! // Generate a toy dataset and train on it
//! pr::synth::generate_dataset("dataset", 0).expect("failed to generate dataset");
//! pr::Trainer::builder()
//!     .dataset("dataset/train")
//!     .weights("weights/context_encoder.bin")
//!     .build()
//!     .expect("failed to load dataset")
//!     .run(None)
//!     .expect("failed to train");
//!
//! // Restore a photograph
//! let restorer = pr::Restorer::new(pr::ContextEncoderConfig::new(), "weights/context_encoder.bin")
//!     .expect("failed to load model");
//! let names = pr::Pipeline::new(restorer)
//!     .run("uploads/fresco.jpg", "results", 0)
//!     .expect("failed to restore");
//! println!("{}", names.enhanced);
//! ```
mod errors;
mod utils;
pub mod edges;
pub mod enhance;
pub mod mask;
pub mod model;
pub mod pipeline;
pub mod restore;
pub mod synth;
pub mod train;

pub use burn;
pub use image;

pub use edges::EdgeDetector;
pub use enhance::Enhancer;
pub use errors::Error;
pub use model::{ContextEncoder, ContextEncoderConfig, InferenceBackend, TrainingBackend};
pub use pipeline::{Pipeline, ResultNames};
pub use restore::{weights_file, Restorer, DEFAULT_WEIGHTS_PATH};
pub use synth::SyntheticArt;
pub use train::{Trainer, TrainerBuilder, TrainingProgress, TrainingReport, TrainingUpdate};
pub use utils::{
    check_output_format, list_images, load_dynamic_image, load_rgb, save_image, ImageSource,
};

/// Simple dimensions struct
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
