//! Adaptive JSON / NDJSON decoding.
//!
//! A response body is decoded either as one JSON document or as a sequence
//! of JSON values separated by whitespace (NDJSON). The mode is chosen by the
//! destination type at compile time, never by sniffing the payload.

use serde::de::{DeserializeOwned, IgnoredAny};
use std::io::Read;
use thiserror::Error;

/// How a destination consumes a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Exactly one JSON value; anything after it is ignored
    Single,
    /// Zero or more JSON values, each appended in arrival order
    Stream,
}

/// Decoding failure.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// The value at position `index` (zero-based) was not well-formed or did
    /// not match the element type. Earlier values were already delivered.
    #[error("malformed JSON value at position {index}: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The body held no JSON value where the caller required one
    #[error("response body contained no JSON value")]
    MissingValue,
}

/// Caller-provided location that receives decoded values.
///
/// `Option<T>` holds a single document, `Vec<T>` collects an NDJSON stream and
/// [`Discard`] validates then drops a single document.
pub trait Destination {
    type Item: DeserializeOwned;

    const SHAPE: Shape;

    fn accept(&mut self, item: Self::Item);
}

impl<T: DeserializeOwned> Destination for Option<T> {
    type Item = T;

    const SHAPE: Shape = Shape::Single;

    fn accept(&mut self, item: T) {
        *self = Some(item);
    }
}

impl<T: DeserializeOwned> Destination for Vec<T> {
    type Item = T;

    const SHAPE: Shape = Shape::Stream;

    fn accept(&mut self, item: T) {
        self.push(item);
    }
}

/// Destination for calls whose response payload is not needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Destination for Discard {
    type Item = IgnoredAny;

    const SHAPE: Shape = Shape::Single;

    fn accept(&mut self, _item: IgnoredAny) {}
}

/// Decode `reader` into `destination`, returning how many values were delivered.
///
/// Single-shape destinations read one value; an empty body leaves the
/// destination untouched and returns `Ok(0)`. Stream-shape destinations read
/// values until end of input and stop at the first malformed one, keeping
/// every value decoded before it.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for the first value that fails to parse.
pub fn decode<R, D>(reader: R, destination: &mut D) -> Result<usize, DecodeError>
where
    R: Read,
    D: Destination + ?Sized,
{
    let mut values = serde_json::Deserializer::from_reader(reader).into_iter::<D::Item>();

    match D::SHAPE {
        Shape::Single => match values.next() {
            None => Ok(0),
            Some(Ok(value)) => {
                destination.accept(value);
                Ok(1)
            }
            Some(Err(source)) => Err(DecodeError::Malformed { index: 0, source }),
        },
        Shape::Stream => {
            let mut index = 0;
            for value in values {
                match value {
                    Ok(value) => destination.accept(value),
                    Err(source) => return Err(DecodeError::Malformed { index, source }),
                }
                index += 1;
            }
            Ok(index)
        }
    }
}
