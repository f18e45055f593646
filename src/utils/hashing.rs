//! # File Hashing
//!
//! Streams files in fixed-size chunks and digests them without loading the
//! whole file into memory.

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Size of the chunks yielded by [`read_file_chunks`].
pub const CHUNK_SIZE: usize = 4096;

#[derive(thiserror::Error, Debug)]
pub enum HashError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Unsupported hash algorithm: '{0}'")]
    UnsupportedAlgorithm(String),
}

/// Digest algorithms accepted by [`compute_hash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake3" => Ok(HashAlgorithm::Blake3),
            _ => Err(HashError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Iterator over the contents of a file in [`CHUNK_SIZE`]-byte chunks.
/// The last chunk may be shorter; an empty file yields nothing.
#[derive(Debug)]
pub struct FileChunks<R> {
    reader: R,
    done: bool,
}

impl<R: Read> FileChunks<R> {
    pub fn new(reader: R) -> Self {
        FileChunks {
            reader,
            done: false,
        }
    }
}

impl<R: Read> Iterator for FileChunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut filled = 0;
        // Fill the whole chunk unless EOF is reached; short reads are allowed by `Read`.
        while filled < CHUNK_SIZE {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        if filled < CHUNK_SIZE {
            self.done = true;
        }
        if filled == 0 {
            return None;
        }
        buf.truncate(filled);
        Some(Ok(buf))
    }
}

/// Opens `file_path` and yields its content in chunks of 4096 bytes.
pub fn read_file_chunks(file_path: impl AsRef<Path>) -> io::Result<FileChunks<File>> {
    Ok(FileChunks::new(File::open(file_path)?))
}

enum Hasher {
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha224 => Hasher::Sha224(Sha224::new()),
            HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => Hasher::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Hasher::Sha224(h) => h.update(chunk),
            Hasher::Sha256(h) => h.update(chunk),
            Hasher::Sha384(h) => h.update(chunk),
            Hasher::Sha512(h) => h.update(chunk),
            Hasher::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    fn hexdigest(self) -> String {
        match self {
            Hasher::Sha224(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha384(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
            Hasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Digests a stream of chunks and returns the lowercase hex digest.
/// The first chunk error aborts hashing.
pub fn compute_hash<I, B>(file_content: I, algorithm: HashAlgorithm) -> Result<String, HashError>
where
    I: IntoIterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    let mut hasher = Hasher::new(algorithm);
    for chunk in file_content {
        hasher.update(chunk?.as_ref());
    }
    Ok(hasher.hexdigest())
}

/// Hex digest of the file at `path`.
pub fn hash_file(path: impl AsRef<Path>, algorithm: HashAlgorithm) -> Result<String, HashError> {
    compute_hash(read_file_chunks(path)?, algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chunks_are_at_most_chunk_size() {
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        let sizes: Vec<usize> = FileChunks::new(Cursor::new(data))
            .map(|c| c.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![CHUNK_SIZE, CHUNK_SIZE, 10]);

        assert_eq!(FileChunks::new(Cursor::new(Vec::new())).count(), 0);
        let exact = FileChunks::new(Cursor::new(vec![1u8; CHUNK_SIZE])).count();
        assert_eq!(exact, 1);
    }

    #[test]
    fn known_digests() {
        let chunks = vec![Ok::<_, io::Error>(b"ab".to_vec()), Ok(b"c".to_vec())];
        assert_eq!(
            compute_hash(chunks, HashAlgorithm::Sha256).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let empty: Vec<io::Result<Vec<u8>>> = Vec::new();
        assert_eq!(
            compute_hash(empty, HashAlgorithm::Blake3).unwrap(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn hashing_a_file_matches_in_memory_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let from_file = hash_file(&path, HashAlgorithm::Sha512).unwrap();
        let in_memory = compute_hash([Ok::<_, io::Error>(data)], HashAlgorithm::Sha512).unwrap();
        assert_eq!(from_file, in_memory);
        assert_eq!(from_file.len(), 128);
    }

    #[test]
    fn parses_algorithm_names() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!(matches!(
            "md5".parse::<HashAlgorithm>(),
            Err(HashError::UnsupportedAlgorithm(name)) if name == "md5"
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = hash_file("/definitely/not/here.bin", HashAlgorithm::Sha256).unwrap_err();
        assert!(matches!(err, HashError::Io(_)));
    }
}
