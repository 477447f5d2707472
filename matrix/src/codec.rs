//! The binary encoding of a single matrix.
//!
//! `rows: u64 LE`, `cols: u64 LE` followed by `rows * cols` little endian `f32` in row-major
//! order. This layout is part of the persisted parameter format, do not change it.

use std::io::{self, Read, Write};

use crate::{Float, Matrix};

const DIM_SIZE: usize = size_of::<u64>();
const ELEM_SIZE: usize = size_of::<Float>();

/// Upper bound on the element count accepted while decoding.
const MAX_ELEMS: usize = u32::MAX as usize;

impl Matrix {
    /// Writes the binary encoding of this matrix.
    ///
    /// # Arguments
    /// * `w` - The destination writer.
    ///
    /// # Returns
    /// The amount of bytes written or an io error.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let mut buf = Vec::with_capacity(2 * DIM_SIZE + self.len() * ELEM_SIZE);
        buf.extend_from_slice(&(self.rows() as u64).to_le_bytes());
        buf.extend_from_slice(&(self.cols() as u64).to_le_bytes());

        for x in self.as_slice() {
            buf.extend_from_slice(&x.to_le_bytes());
        }

        w.write_all(&buf)?;
        Ok(buf.len())
    }

    /// Reads a matrix previously written by `write_to`.
    ///
    /// # Arguments
    /// * `r` - The source reader.
    ///
    /// # Returns
    /// The decoded matrix, an `UnexpectedEof` error on truncated input or `InvalidData` when
    /// the encoded dimensions are not representable.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Matrix> {
        let rows = read_dim(r)?;
        let cols = read_dim(r)?;

        let len = rows
            .checked_mul(cols)
            .filter(|&len| len <= MAX_ELEMS)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid matrix dimensions {rows}x{cols}"),
                )
            })?;

        let expected = len * ELEM_SIZE;
        let mut bytes = Vec::new();
        r.by_ref()
            .take(expected as u64)
            .read_to_end(&mut bytes)?;

        if bytes.len() != expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Truncated matrix data, got {} bytes and expected {expected}",
                    bytes.len()
                ),
            ));
        }

        let mut m = Matrix::zeros(rows, cols);
        m.as_mut_slice()
            .iter_mut()
            .zip(bytes.chunks_exact(ELEM_SIZE))
            .for_each(|(x, chunk)| {
                *x = Float::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            });

        Ok(m)
    }
}

fn read_dim<R: Read>(r: &mut R) -> io::Result<usize> {
    let mut word = [0; DIM_SIZE];
    r.read_exact(&mut word)?;

    usize::try_from(u64::from_le_bytes(word))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
