//! Header and body encoding for raw k-space files

use byteorder::{ByteOrder, LittleEndian};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{KspaceError, KspaceResult};
use crate::types::{KSpaceShape, KSpaceTensor, Sample, BYTES_PER_SAMPLE};

/// Header block size in bytes
pub const HEADER_SIZE: usize = 1024;
/// First header line
pub const MAGIC: &str = "TWIX Data";
/// Sample type written by this codec
pub const DATA_TYPE: &str = "Complex32";

const FIELD_SAMPLES: &str = "Samples";
const FIELD_CHANNELS: &str = "Channels";
const FIELD_LINES: &str = "Lines";
const FIELD_SLICES: &str = "Slices";
const FIELD_DATA_TYPE: &str = "DataType";

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KSpaceHeader {
    pub shape: KSpaceShape,
    /// Informational; the body is always read as `Complex32`
    pub data_type: String,
}

impl KSpaceHeader {
    pub fn new(shape: KSpaceShape) -> Self {
        Self {
            shape,
            data_type: DATA_TYPE.to_string(),
        }
    }

    /// Render the zero-padded header block.
    pub fn to_bytes(&self) -> KspaceResult<Vec<u8>> {
        let text = format!(
            "{MAGIC}\n{FIELD_SAMPLES}: {}\n{FIELD_CHANNELS}: {}\n{FIELD_LINES}: {}\n{FIELD_SLICES}: {}\n{FIELD_DATA_TYPE}: {}\n",
            self.shape.samples, self.shape.channels, self.shape.lines, self.shape.slices, self.data_type
        );
        if text.len() > HEADER_SIZE {
            return Err(KspaceError::malformed(
                FIELD_DATA_TYPE,
                format!("header text is {} bytes, limit is {}", text.len(), HEADER_SIZE),
            ));
        }
        let mut block = text.into_bytes();
        block.resize(HEADER_SIZE, 0);
        Ok(block)
    }

    /// Parse a header block. Text after the first NUL byte is ignored.
    pub fn parse(block: &[u8]) -> KspaceResult<Self> {
        let end = block.iter().position(|&b| b == 0).unwrap_or(block.len());
        let text = String::from_utf8_lossy(&block[..end]);

        let mut lines = text.lines();
        match lines.next() {
            Some(first) if first.trim() == MAGIC => {}
            other => tracing::warn!(found = ?other, "header does not start with '{}'", MAGIC),
        }

        let mut fields: [Option<&str>; 4] = [None; 4];
        let mut data_type = None;
        for line in lines {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            let slot = match key {
                FIELD_SAMPLES => &mut fields[0],
                FIELD_CHANNELS => &mut fields[1],
                FIELD_LINES => &mut fields[2],
                FIELD_SLICES => &mut fields[3],
                FIELD_DATA_TYPE => {
                    data_type.get_or_insert(value);
                    continue;
                }
                _ => continue,
            };
            slot.get_or_insert(value);
        }

        let names = [FIELD_SAMPLES, FIELD_CHANNELS, FIELD_LINES, FIELD_SLICES];
        let mut extents = [0usize; 4];
        for ((extent, value), name) in extents.iter_mut().zip(fields).zip(names) {
            *extent = parse_extent(name, value)?;
        }
        let shape = KSpaceShape::new(extents[0], extents[1], extents[2], extents[3])
            .map_err(|e| KspaceError::malformed("shape", e.to_string()))?;

        let data_type = match data_type {
            Some(dt) if dt == DATA_TYPE => dt.to_string(),
            Some(dt) => {
                tracing::warn!(data_type = dt, "unexpected DataType, reading as {}", DATA_TYPE);
                dt.to_string()
            }
            None => {
                tracing::warn!("header has no DataType, assuming {}", DATA_TYPE);
                DATA_TYPE.to_string()
            }
        };

        Ok(Self { shape, data_type })
    }
}

fn parse_extent(field: &str, value: Option<&str>) -> KspaceResult<usize> {
    let value = value.ok_or_else(|| KspaceError::malformed(field, "missing"))?;
    let extent: usize = value
        .parse()
        .map_err(|_| KspaceError::malformed(field, format!("'{}' is not a non-negative integer", value)))?;
    if extent == 0 {
        return Err(KspaceError::malformed(field, "must be positive"));
    }
    Ok(extent)
}

/// Write header and body to any sink.
pub fn write_to<W: Write>(writer: &mut W, tensor: &KSpaceTensor) -> KspaceResult<()> {
    let shape = tensor.shape();
    writer.write_all(&KSpaceHeader::new(shape).to_bytes()?)?;

    // one slice at a time keeps the staging buffer small
    let mut floats = vec![0.0f32; shape.slice_len() * 2];
    let mut bytes = vec![0u8; shape.slice_len() * BYTES_PER_SAMPLE];
    for chunk in tensor.as_slice().chunks(shape.slice_len()) {
        for (pair, sample) in floats.chunks_exact_mut(2).zip(chunk) {
            pair[0] = sample.re;
            pair[1] = sample.im;
        }
        LittleEndian::write_f32_into(&floats, &mut bytes);
        writer.write_all(&bytes)?;
    }
    Ok(())
}

/// Read header and body from any source. Bytes after the body are not consumed.
pub fn read_from<R: Read>(reader: &mut R) -> KspaceResult<KSpaceTensor> {
    let mut block = Vec::with_capacity(HEADER_SIZE);
    reader.by_ref().take(HEADER_SIZE as u64).read_to_end(&mut block)?;
    if block.len() < HEADER_SIZE {
        return Err(KspaceError::malformed(
            "header",
            format!("expected {} bytes, found {}", HEADER_SIZE, block.len()),
        ));
    }
    let header = KSpaceHeader::parse(&block)?;
    let shape = header.shape;

    // the header is untrusted: grow with the bytes actually present
    let expected = shape.body_bytes();
    let mut body = Vec::new();
    reader.by_ref().take(expected as u64).read_to_end(&mut body)?;
    if body.len() < expected {
        return Err(KspaceError::TruncatedData {
            expected,
            actual: body.len(),
        });
    }

    let mut floats = vec![0.0f32; shape.len() * 2];
    LittleEndian::read_f32_into(&body, &mut floats);
    let samples: Vec<Sample> = floats
        .chunks_exact(2)
        .map(|pair| Sample::new(pair[0], pair[1]))
        .collect();

    KSpaceTensor::from_vec(shape, samples)
}

/// Encode a tensor into a byte vector.
pub fn encode_to_vec(tensor: &KSpaceTensor) -> KspaceResult<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_SIZE + tensor.shape().body_bytes());
    write_to(&mut out, tensor)?;
    Ok(out)
}

/// Decode a tensor from a byte slice.
pub fn decode_bytes(mut bytes: &[u8]) -> KspaceResult<KSpaceTensor> {
    read_from(&mut bytes)
}

/// Write a tensor to `path`, flushed and synced. A failed write leaves no file behind.
pub fn encode(tensor: &KSpaceTensor, path: impl AsRef<Path>) -> KspaceResult<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    if let Err(err) = write_file(file, tensor) {
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %cleanup, "could not remove partial file");
        }
        return Err(err);
    }
    tracing::info!(
        path = %path.display(),
        shape = %tensor.shape(),
        bytes = HEADER_SIZE + tensor.shape().body_bytes(),
        "wrote k-space file"
    );
    Ok(())
}

fn write_file(file: File, tensor: &KSpaceTensor) -> KspaceResult<()> {
    let mut writer = BufWriter::new(file);
    write_to(&mut writer, tensor)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

/// Read a tensor from `path`.
pub fn decode(path: impl AsRef<Path>) -> KspaceResult<KSpaceTensor> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let tensor = read_from(&mut reader)?;
    tracing::info!(path = %path.display(), shape = %tensor.shape(), "read k-space file");
    Ok(tensor)
}
