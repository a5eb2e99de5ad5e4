//! Binary sidecar readers for precomputed partitions.
//!
//! Two formats, both little-endian:
//! - `<base>.META.<host>.OF.<N>`: a `u64` entry count followed by 24-byte
//!   records `(global_id, local_id, owner_id)`, each a `u64`.
//! - the vertex owner map: a flat array of `i32`, one per global vertex,
//!   addressed by byte offset `gid * 4`.

use crate::error::AmorphError;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// One record of a META sidecar file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NodeInfo {
    pub global_id: u64,
    pub local_id: u64,
    pub owner_id: u64,
}

/// `<base>.META.<host>.OF.<num_hosts>`
pub fn meta_file_name(base: &Path, host: u32, num_hosts: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".META.{host}.OF.{num_hosts}"));
    PathBuf::from(name)
}

/// `<base>.PART.<host>.OF.<num_hosts>`
pub fn partition_file_name(base: &Path, host: u32, num_hosts: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".PART.{host}.OF.{num_hosts}"));
    PathBuf::from(name)
}

fn read_u64(r: &mut impl Read) -> std::io::Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

/// Read every record of a META sidecar file.
pub fn read_meta_file(path: &Path) -> Result<Vec<NodeInfo>, AmorphError> {
    let file = File::open(path).map_err(|source| {
        log::error!("unable to open partition metadata file {}", path.display());
        AmorphError::MetaFileOpen {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let mut r = BufReader::new(file);

    let truncated = |got: u64, expected: u64| AmorphError::MetaFileTruncated {
        path: path.to_path_buf(),
        expected,
        got,
    };
    let num_entries = read_u64(&mut r).map_err(|_| truncated(0, 0))?;
    log::debug!("{}: {} partition metadata entries", path.display(), num_entries);

    let mut entries = Vec::with_capacity(num_entries as usize);
    for i in 0..num_entries {
        let global_id = read_u64(&mut r).map_err(|_| truncated(i, num_entries))?;
        let local_id = read_u64(&mut r).map_err(|_| truncated(i, num_entries))?;
        let owner_id = read_u64(&mut r).map_err(|_| truncated(i, num_entries))?;
        entries.push(NodeInfo {
            global_id,
            local_id,
            owner_id,
        });
    }
    Ok(entries)
}

/// Read the owner of every vertex in `range` from the flat vertex owner map.
///
/// Seeks to byte offset `range.start * 4` and reads one `i32` per vertex.
pub fn read_vertex_owner_map(path: &Path, range: Range<u64>) -> Result<Vec<i32>, AmorphError> {
    let file = File::open(path).map_err(|source| {
        log::error!("unable to open vertex owner map {}", path.display());
        AmorphError::VertexMapOpen {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let mut r = BufReader::new(file);

    let truncated = || AmorphError::VertexMapTruncated {
        path: path.to_path_buf(),
        lo: range.start,
        hi: range.end,
    };
    r.seek(SeekFrom::Start(range.start * 4))
        .map_err(|_| truncated())?;

    let n = (range.end - range.start) as usize;
    let mut owners = Vec::with_capacity(n);
    let mut b = [0u8; 4];
    for _ in 0..n {
        r.read_exact(&mut b).map_err(|_| truncated())?;
        owners.push(i32::from_le_bytes(b));
    }
    log::debug!("{}: read owners for vertices [{}, {})", path.display(), range.start, range.end);
    Ok(owners)
}
