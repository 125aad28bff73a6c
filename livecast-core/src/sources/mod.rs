//! Elementary stream files used as broadcast input.

pub mod adts;
pub mod annexb;

pub use self::{
    adts::{AdtsHeader, AdtsStream},
    annexb::AccessUnit,
};
