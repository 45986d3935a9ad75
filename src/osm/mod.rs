// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod profile;
mod reader;

pub use profile::{Profile, CAR_PROFILE};
pub use reader::{
    read_snapshot_from_buffer, read_snapshot_from_file, read_snapshot_from_files,
    read_snapshot_from_io, Error, FileFormat, Options, Snapshot, SnapshotBuilder,
};

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{earth_distance, shortest_path, SearchError, SearchLimits};

    const DATA: &[u8] = include_bytes!("reader/test_fixtures/simple.osm");

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    fn options(file_format: FileFormat) -> Options<'static> {
        Options {
            profile: &CAR_PROFILE,
            file_format,
            bbox: [0.0; 4],
        }
    }

    fn compress_gz(data: &[u8]) -> Vec<u8> {
        let mut e = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    fn compress_bz2(data: &[u8]) -> Vec<u8> {
        let mut e = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    fn check_simple_snapshot(s: &Snapshot) {
        //   -7
        //   │
        //   -6
        //
        //  -4─────-3
        //   │      ║
        //  -1─────-2

        // Footways, driveways and inaccessible roads are not part of the network
        assert_eq!(
            s.nodes.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![-7, -6, -4, -3, -2, -1],
        );
        assert_eq!(s.edges.len(), 6);

        let g = s.clone().into_graph().unwrap();
        assert_eq!(g.len(), 6);
        assert_eq!(g.edge_count(), 6);

        // Edge lengths are the great-circle distances between nodes, in both directions
        assert_almost_eq!(
            g.edge_between(-1, -2).unwrap(),
            earth_distance(40.7, -74.0, 40.7, -73.999)
        );
        assert_eq!(g.edge_between(-1, -2), g.edge_between(-2, -1));

        // oneway=yes does not restrict the undirected network
        assert!(g.edge_between(-1, -4).is_some());
        assert!(g.edge_between(-4, -3).is_some());

        // Parallel ways -100 and -106 are both kept
        assert_eq!(g.neighbors(-2).unwrap().filter(|&(n, _)| n == -3).count(), 2);

        // Excluded ways
        assert_eq!(g.edge_between(-1, -3), None);
        assert_eq!(g.get_node(-5), None);
        assert_eq!(g.get_node(-9), None);

        let path = shortest_path(&g, -1, -3, &SearchLimits::UNLIMITED).unwrap();
        assert_eq!(path.nodes, vec![-1, -2, -3]);

        assert_eq!(
            shortest_path(&g, -1, -7, &SearchLimits::UNLIMITED),
            Err(SearchError::NoPath { from: -1, to: -7 }),
        );
    }

    #[test]
    fn read_xml() {
        let s = read_snapshot_from_buffer(&options(FileFormat::Xml), DATA).unwrap();
        check_simple_snapshot(&s);
    }

    #[test]
    fn read_xml_io() {
        let s = read_snapshot_from_io(&options(FileFormat::Xml), std::io::Cursor::new(DATA))
            .unwrap();
        check_simple_snapshot(&s);
    }

    #[test]
    fn read_gz() {
        let data = compress_gz(DATA);
        let s = read_snapshot_from_buffer(&options(FileFormat::XmlGz), &data).unwrap();
        check_simple_snapshot(&s);
    }

    #[test]
    fn read_bz2() {
        let data = compress_bz2(DATA);
        let s = read_snapshot_from_buffer(&options(FileFormat::XmlBz2), &data).unwrap();
        check_simple_snapshot(&s);
    }

    #[test]
    fn detect_format() {
        assert_eq!(FileFormat::detect(DATA), FileFormat::Xml);
        assert_eq!(FileFormat::detect(&compress_gz(DATA)), FileFormat::XmlGz);
        assert_eq!(FileFormat::detect(&compress_bz2(DATA)), FileFormat::XmlBz2);

        for data in [DATA.to_vec(), compress_gz(DATA), compress_bz2(DATA)] {
            let s = read_snapshot_from_buffer(&options(FileFormat::Unknown), &data).unwrap();
            check_simple_snapshot(&s);

            let s = read_snapshot_from_io(&options(FileFormat::Unknown), data.as_slice()).unwrap();
            check_simple_snapshot(&s);
        }
    }

    #[test]
    fn read_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/src/osm/reader/test_fixtures/simple.osm");
        let s = read_snapshot_from_file(&options(FileFormat::Unknown), path).unwrap();
        check_simple_snapshot(&s);

        // Overlapping extracts don't duplicate any roads
        let s = read_snapshot_from_files(&options(FileFormat::Unknown), [path, path]).unwrap();
        check_simple_snapshot(&s);

        let missing = read_snapshot_from_file(&options(FileFormat::Unknown), "does/not/exist.osm");
        assert!(matches!(missing, Err(Error::Io(_))));
    }

    #[test]
    fn merge_extracts() {
        const EXTRA: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="-1" lat="40.7000" lon="-74.0000"/>
  <node id="-2" lat="40.7000" lon="-73.9990"/>
  <node id="-3" lat="40.7010" lon="-73.9990"/>
  <node id="-20" lat="40.7020" lon="-73.9990"/>
  <way id="-100">
    <nd ref="-1"/>
    <nd ref="-2"/>
    <nd ref="-3"/>
    <tag k="highway" v="residential"/>
  </way>
  <way id="-300">
    <nd ref="-3"/>
    <nd ref="-20"/>
    <tag k="highway" v="unclassified"/>
  </way>
</osm>"#;

        let options = options(FileFormat::Unknown);
        let mut b = SnapshotBuilder::new(&options);
        b.add_buffer(DATA).unwrap();
        b.add_buffer(&compress_gz(EXTRA)).unwrap();
        let s = b.finish();

        assert_eq!(s.nodes.len(), 7);
        assert_eq!(s.edges.len(), 7);

        let g = s.into_graph().unwrap();
        let path = shortest_path(&g, -1, -20, &SearchLimits::UNLIMITED).unwrap();
        assert_eq!(path.nodes, vec![-1, -2, -3, -20]);
    }

    #[test]
    fn malformed_input() {
        const BROKEN: &[u8] = b"<osm><way id=\"1\"><nd ref=\"1\"/></node></osm>";
        let result = read_snapshot_from_buffer(&options(FileFormat::Xml), BROKEN);
        assert!(matches!(result, Err(Error::Xml(_))));
    }
}
