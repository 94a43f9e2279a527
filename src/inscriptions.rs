use super::*;

pub use self::{envelope::Envelope, inscription::Inscription, inscription_id::InscriptionId};

pub mod envelope;
pub mod inscription;
pub mod inscription_id;
mod tag;

use tag::Tag;
