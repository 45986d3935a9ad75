// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use crate::osm::Profile;

mod model;
mod snapshot_builder;
mod xml;

pub use snapshot_builder::{Snapshot, SnapshotBuilder};

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format of a file by its first bytes. Anything which is neither
    /// gzip nor bzip2 compressed is assumed to be plain XML.
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(&[0x1f, 0x8b]) {
            Self::XmlGz
        } else if prefix.starts_with(b"BZh") {
            Self::XmlBz2
        } else {
            Self::Xml
        }
    }
}

/// Additional controls for interpreting OSM data as a road network.
#[derive(Debug)]
pub struct Options<'a> {
    /// Which OSM ways make up the road network.
    pub profile: &'a Profile<'a>,

    /// Format of the input data.
    pub file_format: FileFormat,

    /// Filter features by a specific bounding box. In order: left (min lon), bottom (min lat),
    /// right (max lon), top (max lat). Ignored if all values are set to zero, or at least one
    /// of them is not finite.
    pub bbox: [f64; 4],
}

/// Error conditions which may occur when reading OSM data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid OSM XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl<'a> SnapshotBuilder<'a> {
    /// Parse OSM features from a reader into the snapshot.
    ///
    /// The provided stream will be automatically wrapped in a buffered reader.
    pub fn add_io<R: io::Read>(&mut self, reader: R) -> Result<(), Error> {
        let mut b = io::BufReader::new(reader);

        let format = match self.options.file_format {
            FileFormat::Unknown => FileFormat::detect(b.fill_buf()?),
            format => format,
        };
        log::debug!("reading OSM data as {format:?}");

        match format {
            FileFormat::XmlGz => {
                let d = flate2::read::MultiGzDecoder::new(b);
                self.add_features(xml::Reader::from_io(io::BufReader::new(d)))?;
            }

            FileFormat::XmlBz2 => {
                let d = bzip2::read::MultiBzDecoder::new(b);
                self.add_features(xml::Reader::from_io(io::BufReader::new(d)))?;
            }

            FileFormat::Xml | FileFormat::Unknown => {
                self.add_features(xml::Reader::from_io(b))?;
            }
        }

        Ok(())
    }

    /// Parse OSM features from a file at the provided path into the snapshot.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        log::info!("loading {}", path.as_ref().display());
        let f = File::open(path)?;
        self.add_io(f)
    }

    /// Parse OSM features from an in-memory buffer into the snapshot.
    pub fn add_buffer(&mut self, data: &[u8]) -> Result<(), Error> {
        let format = match self.options.file_format {
            FileFormat::Unknown => FileFormat::detect(data),
            format => format,
        };

        if format == FileFormat::Xml {
            // Fast path is available for in-memory XML data
            self.add_features(xml::Reader::from_buffer(data))?;
            Ok(())
        } else {
            // Wrap the buffer in a cursor and use the IO path
            self.add_io(io::Cursor::new(data))
        }
    }
}

/// Read a road network [Snapshot] from a reader as per the provided [Options].
pub fn read_snapshot_from_io<R: io::Read>(
    options: &Options<'_>,
    reader: R,
) -> Result<Snapshot, Error> {
    let mut b = SnapshotBuilder::new(options);
    b.add_io(reader)?;
    Ok(b.finish())
}

/// Read a road network [Snapshot] from a file at the provided path as per the provided [Options].
pub fn read_snapshot_from_file<P: AsRef<Path>>(
    options: &Options<'_>,
    path: P,
) -> Result<Snapshot, Error> {
    let mut b = SnapshotBuilder::new(options);
    b.add_file(path)?;
    Ok(b.finish())
}

/// Read a road network [Snapshot] from an in-memory buffer as per the provided [Options].
pub fn read_snapshot_from_buffer(options: &Options<'_>, data: &[u8]) -> Result<Snapshot, Error> {
    let mut b = SnapshotBuilder::new(options);
    b.add_buffer(data)?;
    Ok(b.finish())
}

/// Read multiple extracts into a single road network [Snapshot] as per the provided [Options].
///
/// Nodes and road segments present in more than one extract are imported only once.
pub fn read_snapshot_from_files<I, P>(options: &Options<'_>, paths: I) -> Result<Snapshot, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut b = SnapshotBuilder::new(options);
    for path in paths {
        b.add_file(path)?;
    }
    Ok(b.finish())
}
