//! The binary encoding of a parameter.
//!
//! A parameter is encoded as its value, followed by a payload header `{label: i64 LE, count:
//! i64 LE}` and then `count` matrices. A missing payload is encoded as a `{0, 0}` header with
//! nothing after it, and a `{0, 0}` header always decodes to a missing payload. Matrices use
//! the `matrix` codec.

use std::io::{self, Read, Write};

use bytemuck::{Pod, Zeroable};
use matrix::Matrix;

use crate::{Param, Payload, Result};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
struct Header {
    label: i64,
    count: i64,
}

impl Header {
    fn to_native(self) -> Self {
        Self {
            label: i64::from_le(self.label),
            count: i64::from_le(self.count),
        }
    }

    fn to_le(self) -> Self {
        Self {
            label: self.label.to_le(),
            count: self.count.to_le(),
        }
    }
}

/// The decoded contents of a parameter.
#[derive(Debug, PartialEq)]
pub struct ParamData {
    pub value: Matrix,
    pub payload: Option<Payload>,
}

impl ParamData {
    /// Builds an unnamed parameter that requires gradients out of the decoded data.
    pub fn into_param(self) -> Param {
        Param::with_parts(self.value, self.payload)
    }
}

/// Writes the encoding of `param`.
///
/// # Arguments
/// * `param` - The parameter to encode, its lock is held while writing.
/// * `w` - The destination writer.
///
/// # Returns
/// The amount of bytes written or a `Decode` error wrapping the io failure.
pub fn serialize<W: Write>(param: &Param, w: &mut W) -> Result<usize> {
    let state = param.state();
    write_parts(&state.value, state.payload.as_ref(), w)
}

/// Reads a parameter previously written by `serialize`.
///
/// # Arguments
/// * `r` - The source reader.
///
/// # Returns
/// The decoded data or a `Decode` error on truncated or malformed input.
pub fn deserialize<R: Read>(r: &mut R) -> Result<ParamData> {
    let value = Matrix::read_from(r)?;

    let mut raw = [0; size_of::<Header>()];
    r.read_exact(&mut raw)?;
    let header = bytemuck::pod_read_unaligned::<Header>(&raw).to_native();

    let count = usize::try_from(header.count).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative payload size {}", header.count),
        )
    })?;

    if header.label == 0 && count == 0 {
        return Ok(ParamData {
            value,
            payload: None,
        });
    }

    let data = (0..count)
        .map(|_| Matrix::read_from(r))
        .collect::<io::Result<Vec<_>>>()?;

    Ok(ParamData {
        value,
        payload: Some(Payload::new(header.label, data)),
    })
}

pub(crate) fn write_parts<W: Write>(
    value: &Matrix,
    payload: Option<&Payload>,
    w: &mut W,
) -> Result<usize> {
    let mut n = value.write_to(w)?;

    let header = match payload {
        Some(payload) => Header {
            label: payload.label,
            count: payload.data.len() as i64,
        },
        None => Header::zeroed(),
    };

    w.write_all(bytemuck::bytes_of(&header.to_le()))?;
    n += size_of::<Header>();

    for m in payload.into_iter().flat_map(|p| &p.data) {
        n += m.write_to(w)?;
    }

    Ok(n)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::ParamErr;

    fn encode(param: &Param) -> Vec<u8> {
        let mut buf = Vec::new();
        let n = serialize(param, &mut buf).unwrap();
        assert_eq!(n, buf.len());
        buf
    }

    #[test]
    fn without_payload() {
        let param = Param::new(Matrix::from_slice(2, 1, &[1., 2.]).unwrap());
        let buf = encode(&param);

        // value, then a zeroed header
        assert_eq!(buf.len(), 16 + 8 + 16);
        assert!(buf[24..].iter().all(|&b| b == 0));

        let data = deserialize(&mut Cursor::new(buf)).unwrap();
        assert_eq!(data.value, *param.value());
        assert!(data.payload.is_none());
    }

    #[test]
    fn with_payload() {
        let param = Param::new(Matrix::ones(1, 2));
        let payload = Payload::new(
            2,
            vec![Matrix::zeros(1, 2), Matrix::ones(1, 2), Matrix::scalar(4.)],
        );
        param.set_payload(payload.clone()).unwrap();

        let buf = encode(&param);
        assert_eq!(&buf[24..32], &2i64.to_le_bytes());
        assert_eq!(&buf[32..40], &3i64.to_le_bytes());

        let data = deserialize(&mut Cursor::new(buf)).unwrap();
        assert_eq!(data.value, Matrix::ones(1, 2));
        assert_eq!(data.payload, Some(payload));
    }

    #[test]
    fn labelled_payload_without_data_survives() {
        let param = Param::new(Matrix::scalar(1.));
        param.set_payload(Payload::new(5, Vec::new())).unwrap();

        let data = deserialize(&mut Cursor::new(encode(&param))).unwrap();
        assert_eq!(data.payload, Some(Payload::new(5, Vec::new())));
    }

    #[test]
    fn truncated_input_is_an_error() {
        let param = Param::new(Matrix::ones(2, 2));
        param
            .set_payload(Payload::new(1, vec![Matrix::ones(2, 2)]))
            .unwrap();
        let buf = encode(&param);

        for cut in [0, 10, 20, 35, 45, buf.len() - 1] {
            let res = deserialize(&mut Cursor::new(&buf[..cut]));
            assert!(matches!(res, Err(ParamErr::Decode(_))), "cut at {cut}");
        }
    }

    #[test]
    fn negative_count_is_an_error() {
        let mut buf = Vec::new();
        Matrix::scalar(1.).write_to(&mut buf).unwrap();
        buf.extend_from_slice(&1i64.to_le_bytes());
        buf.extend_from_slice(&(-3i64).to_le_bytes());

        let err = deserialize(&mut Cursor::new(buf)).unwrap_err();
        let ParamErr::Decode(e) = err else {
            panic!("expected a decode error, got {err}");
        };
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
    }
}
