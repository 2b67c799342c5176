// src/compression.rs
use crate::error::{OpError, OpResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// gzip-compresses `input` into `output`, overwriting it.
pub fn compress_file(input: &Path, output: &Path, level: u32) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(output)?);
    let mut encoder = GzEncoder::new(writer, Compression::new(level.min(9)));
    io::copy(&mut reader, &mut encoder)?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Compresses the plain dump at `raw` into `artifact`: the stream is written to a
/// `.tmp` sibling, `raw` is removed, then the temp file is renamed into place.
pub fn compress_into_artifact(raw: &Path, artifact: &Path, level: u32) -> io::Result<()> {
    let mut tmp_name = artifact.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);

    let result = compress_file(raw, tmp, level)
        .and_then(|()| fs::remove_file(raw))
        .and_then(|()| fs::rename(tmp, artifact));
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}

/// Reads the whole decompressed payload of a gzip file.
pub fn decompress_to_vec(path: &Path) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(BufReader::new(File::open(path)?));
    let mut data = Vec::new();
    decoder.read_to_end(&mut data)?;
    Ok(data)
}

/// Checks that the artifact exists, is non-empty and starts with a decodable gzip stream.
pub fn verify_artifact(path: &Path) -> OpResult<()> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(OpError::ArtifactMissing(path.to_path_buf()))
        }
        Err(e) => {
            return Err(OpError::ArtifactInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    if metadata.len() == 0 {
        return Err(OpError::ArtifactInvalid {
            path: path.to_path_buf(),
            reason: "file is empty".into(),
        });
    }

    let invalid = |reason: String| OpError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::open(path).map_err(|e| invalid(e.to_string()))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut first = [0u8; 1];
    decoder
        .read(&mut first)
        .map_err(|e| invalid(format!("not a gzip stream: {}", e)))?;
    Ok(())
}
