//! Minimal NumPy `.npy` reader and writer for trial artifacts.
//!
//! Layout: magic `\x93NUMPY`, version byte pair, little-endian header length
//! (u16 for 1.0, u32 for 2.0/3.0), an ASCII Python dict header
//! (`descr`, `fortran_order`, `shape`), then raw element data.
//!
//! Arrays of any shape are read flat; only element types used by the
//! receiver (bool, integers, floats, complex) are supported.

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use num_complex::Complex64;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use crate::error::{ReceiverError, Result};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Int,
    UInt,
    Float,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    kind: Kind,
    size: usize,
    endian: Endian,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self> {
        let bad = || ReceiverError::Npy(format!("unsupported dtype '{}'", descr));

        let mut chars = descr.chars();
        let first = chars.next().ok_or_else(bad)?;
        let (order, rest) = match first {
            '<' | '>' | '|' | '=' => (first, chars.as_str()),
            _ => ('=', descr),
        };

        let mut rest_chars = rest.chars();
        let kind = match rest_chars.next().ok_or_else(bad)? {
            'b' => Kind::Bool,
            'i' => Kind::Int,
            'u' => Kind::UInt,
            'f' => Kind::Float,
            'c' => Kind::Complex,
            _ => return Err(bad()),
        };
        let size: usize = rest_chars.as_str().parse().map_err(|_| bad())?;

        let valid = match kind {
            Kind::Bool => size == 1,
            Kind::Int | Kind::UInt => matches!(size, 1 | 2 | 4 | 8),
            Kind::Float => matches!(size, 4 | 8),
            Kind::Complex => matches!(size, 8 | 16),
        };
        if !valid {
            return Err(bad());
        }

        let endian = match order {
            '<' => Endian::Little,
            '>' => Endian::Big,
            _ if cfg!(target_endian = "big") => Endian::Big,
            _ => Endian::Little,
        };

        Ok(Self { kind, size, endian })
    }
}

#[derive(Debug)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Text following `'key':` in the header dict.
fn header_field<'a>(text: &'a str, key: &str) -> Result<&'a str> {
    let pattern = format!("'{}':", key);
    let start = text
        .find(&pattern)
        .ok_or_else(|| ReceiverError::Npy(format!("header missing '{}'", key)))?;
    Ok(text[start + pattern.len()..].trim_start())
}

fn parse_header(raw: &str) -> Result<Header> {
    let text = raw.replace('"', "'");

    let descr_text = header_field(&text, "descr")?;
    let descr = descr_text
        .strip_prefix('\'')
        .and_then(|s| s.split('\'').next())
        .ok_or_else(|| ReceiverError::Npy("malformed descr".into()))?;
    let dtype = Dtype::parse(descr)?;

    let fortran_order = header_field(&text, "fortran_order")?.starts_with("True");

    let shape_text = header_field(&text, "shape")?;
    let inner = shape_text
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or_else(|| ReceiverError::Npy("malformed shape".into()))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| ReceiverError::Npy(format!("bad shape entry '{}'", s)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Header {
        dtype,
        fortran_order,
        shape,
    })
}

/// Flat contents of an `.npy` array.
#[derive(Debug, Clone, PartialEq)]
pub enum NpyData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl NpyData {
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples as complex values; real dtypes get a zero imaginary part.
    pub fn into_complex(self) -> Vec<Complex64> {
        let real = |v: f64| Complex64::new(v, 0.0);
        match self {
            Self::Complex(v) => v,
            Self::Float(v) => v.into_iter().map(real).collect(),
            Self::Int(v) => v.into_iter().map(|x| real(x as f64)).collect(),
            Self::UInt(v) => v.into_iter().map(|x| real(x as f64)).collect(),
            Self::Bool(v) => v.into_iter().map(|x| real(f64::from(u8::from(x)))).collect(),
        }
    }

    /// Values cast to `u8` and masked to their low bit.
    ///
    /// Floats are truncated first; non-finite floats and complex arrays
    /// cannot be coerced.
    pub fn to_bits(&self) -> Result<Vec<u8>> {
        match self {
            Self::Bool(v) => Ok(v.iter().map(|&b| u8::from(b)).collect()),
            Self::Int(v) => Ok(v.iter().map(|&x| (x as u8) & 1).collect()),
            Self::UInt(v) => Ok(v.iter().map(|&x| (x as u8) & 1).collect()),
            Self::Float(v) => v
                .iter()
                .map(|&x| {
                    if x.is_finite() {
                        Ok((x.trunc() as i64 as u8) & 1)
                    } else {
                        Err(ReceiverError::Npy(format!("cannot cast {} to a bit", x)))
                    }
                })
                .collect(),
            Self::Complex(_) => Err(ReceiverError::Npy(
                "complex array cannot be read as bits".into(),
            )),
        }
    }
}

fn read_values<B: ByteOrder>(
    dtype: Dtype,
    bytes: &[u8],
    count: usize,
) -> std::io::Result<NpyData> {
    let mut cur = Cursor::new(bytes);
    let data = match (dtype.kind, dtype.size) {
        (Kind::Bool, _) => NpyData::Bool(bytes.iter().map(|&b| b != 0).collect()),
        (Kind::Int, 1) => NpyData::Int(bytes.iter().map(|&b| b as i8 as i64).collect()),
        (Kind::Int, 2) => NpyData::Int(
            (0..count)
                .map(|_| cur.read_i16::<B>().map(i64::from))
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::Int, 4) => NpyData::Int(
            (0..count)
                .map(|_| cur.read_i32::<B>().map(i64::from))
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::Int, _) => NpyData::Int(
            (0..count)
                .map(|_| cur.read_i64::<B>())
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::UInt, 1) => NpyData::UInt(bytes.iter().map(|&b| u64::from(b)).collect()),
        (Kind::UInt, 2) => NpyData::UInt(
            (0..count)
                .map(|_| cur.read_u16::<B>().map(u64::from))
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::UInt, 4) => NpyData::UInt(
            (0..count)
                .map(|_| cur.read_u32::<B>().map(u64::from))
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::UInt, _) => NpyData::UInt(
            (0..count)
                .map(|_| cur.read_u64::<B>())
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::Float, 4) => NpyData::Float(
            (0..count)
                .map(|_| cur.read_f32::<B>().map(f64::from))
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::Float, _) => NpyData::Float(
            (0..count)
                .map(|_| cur.read_f64::<B>())
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::Complex, 8) => NpyData::Complex(
            (0..count)
                .map(|_| -> std::io::Result<Complex64> {
                    let re = cur.read_f32::<B>()?;
                    let im = cur.read_f32::<B>()?;
                    Ok(Complex64::new(f64::from(re), f64::from(im)))
                })
                .collect::<std::io::Result<_>>()?,
        ),
        (Kind::Complex, _) => NpyData::Complex(
            (0..count)
                .map(|_| -> std::io::Result<Complex64> {
                    let re = cur.read_f64::<B>()?;
                    let im = cur.read_f64::<B>()?;
                    Ok(Complex64::new(re, im))
                })
                .collect::<std::io::Result<_>>()?,
        ),
    };
    Ok(data)
}

/// Read exactly `len` bytes. The buffer grows with what the reader actually
/// yields, so a lying length field cannot force a huge allocation.
fn read_exactly<R: Read>(reader: &mut R, len: usize, what: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader
        .by_ref()
        .take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|e| ReceiverError::Npy(e.to_string()))?;
    if buf.len() != len {
        return Err(ReceiverError::Npy(format!(
            "truncated {}: expected {} bytes, found {}",
            what,
            len,
            buf.len()
        )));
    }
    Ok(buf)
}

/// Read an `.npy` array from `reader`.
pub fn read_npy<R: Read>(mut reader: R) -> Result<NpyData> {
    let npy_err = |e: std::io::Error| ReceiverError::Npy(e.to_string());

    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic).map_err(npy_err)?;
    if &magic != MAGIC {
        return Err(ReceiverError::Npy("not an .npy file".into()));
    }

    let major = reader.read_u8().map_err(npy_err)?;
    let _minor = reader.read_u8().map_err(npy_err)?;
    let header_len = match major {
        1 => reader.read_u16::<LittleEndian>().map_err(npy_err)? as usize,
        2 | 3 => reader.read_u32::<LittleEndian>().map_err(npy_err)? as usize,
        v => return Err(ReceiverError::Npy(format!("unsupported version {}", v))),
    };

    let header_bytes = read_exactly(&mut reader, header_len, "header")?;
    let header = parse_header(&String::from_utf8_lossy(&header_bytes))?;

    if header.fortran_order && header.shape.iter().filter(|&&d| d > 1).count() > 1 {
        return Err(ReceiverError::Npy(
            "Fortran-ordered multi-dimensional arrays are not supported".into(),
        ));
    }

    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| ReceiverError::Npy(format!("shape {:?} overflows", header.shape)))?;
    let payload_len = count
        .checked_mul(header.dtype.size)
        .ok_or_else(|| ReceiverError::Npy(format!("{} elements overflow", count)))?;
    let bytes = read_exactly(&mut reader, payload_len, "data")?;

    let values = match header.dtype.endian {
        Endian::Little => read_values::<LittleEndian>(header.dtype, &bytes, count),
        Endian::Big => read_values::<BigEndian>(header.dtype, &bytes, count),
    };
    values.map_err(npy_err)
}

pub fn load(path: &Path) -> Result<NpyData> {
    let file = File::open(path).map_err(|e| ReceiverError::io(path, e))?;
    read_npy(BufReader::new(file))
}

/// Version 1.0 header for a 1-D array, padded so data starts on a
/// 64-byte boundary.
fn header_bytes(descr: &str, len: usize) -> Vec<u8> {
    let mut dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({},), }}",
        descr, len
    );
    // magic (6) + version (2) + length (2) + dict + '\n'
    let unpadded = MAGIC.len() + 4 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.extend(std::iter::repeat_n(' ', padding));
    dict.push('\n');

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + dict.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out
}

/// Write bytes as a 1-D `uint8` array.
pub fn write_u8<W: Write>(mut writer: W, values: &[u8]) -> Result<()> {
    let npy_err = |e: std::io::Error| ReceiverError::Npy(e.to_string());
    writer.write_all(&header_bytes("|u1", values.len())).map_err(npy_err)?;
    writer.write_all(values).map_err(npy_err)?;
    writer.flush().map_err(npy_err)
}

/// Write samples as a 1-D little-endian `complex128` array.
pub fn write_complex<W: Write>(mut writer: W, values: &[Complex64]) -> Result<()> {
    let npy_err = |e: std::io::Error| ReceiverError::Npy(e.to_string());
    writer.write_all(&header_bytes("<c16", values.len())).map_err(npy_err)?;
    for v in values {
        writer.write_f64::<LittleEndian>(v.re).map_err(npy_err)?;
        writer.write_f64::<LittleEndian>(v.im).map_err(npy_err)?;
    }
    writer.flush().map_err(npy_err)
}

pub fn save_u8(path: &Path, values: &[u8]) -> Result<()> {
    let file = File::create(path).map_err(|e| ReceiverError::io(path, e))?;
    write_u8(BufWriter::new(file), values)
}

pub fn save_complex(path: &Path, values: &[Complex64]) -> Result<()> {
    let file = File::create(path).map_err(|e| ReceiverError::io(path, e))?;
    write_complex(BufWriter::new(file), values)
}
