//! Catalyst Center map archive handling
//!
//! An exported archive is a `.tar.gz` holding:
//! - `images/<floor image>` (jpg, the raw floor image uploaded to Catalyst Center)
//! - `xmlDir/MapsImportExport.xml` (building civic address + planned APs)

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{MigrateError, Result};
use crate::models::{Coordinates, SourceDevice};

pub const MAP_XML_PATH: &str = "xmlDir/MapsImportExport.xml";
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Contents of an extracted archive needed to build a Meraki floor plan
#[derive(Debug, Clone)]
pub struct FloorArchive {
    pub root: PathBuf,
    pub image_name: String,
    pub image_base64: String,
    /// `CivicAddress` coordinates, if the export carried them
    pub civic_location: Option<Coordinates>,
    pub devices: Vec<SourceDevice>,
}

/// Directory an archive is extracted into: `<dir>/<stem>.tar.gz` → `<dir>/<stem>`
pub fn extraction_dir(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(".tar.gz")
        .or_else(|| name.strip_suffix(".tgz"))
        .unwrap_or(&name);
    let stem = if stem == name { format!("{name}.d") } else { stem.to_string() };
    archive.with_file_name(stem)
}

/// Gunzip and untar `archive` next to itself, returning the extraction dir
pub fn extract(archive: &Path) -> Result<PathBuf> {
    let target = extraction_dir(archive);
    std::fs::create_dir_all(&target)?;

    let file = File::open(archive)?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(&target)
        .map_err(|e| MigrateError::Archive(format!("cannot extract {}: {e}", archive.display())))?;

    info!("File extracted successfully to: {}", target.display());
    Ok(target)
}

/// Read the floor image and map XML of an extracted archive
pub fn load(dir: &Path) -> Result<FloorArchive> {
    let root = archive_root(dir)?;

    let image_path = find_image(&root.join("images"))?;
    let image_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let image_base64 = BASE64.encode(std::fs::read(&image_path)?);

    let xml = std::fs::read_to_string(root.join(MAP_XML_PATH))?;
    let (civic_location, devices) = parse_map_xml(&xml)?;
    debug!(
        "Archive {}: image {}, {} planned APs, civic address {:?}",
        root.display(),
        image_name,
        devices.len(),
        civic_location
    );

    Ok(FloorArchive {
        root,
        image_name,
        image_base64,
        civic_location,
        devices,
    })
}

/// Exports sometimes wrap everything in a single top-level folder
fn archive_root(dir: &Path) -> Result<PathBuf> {
    if dir.join(MAP_XML_PATH).is_file() {
        return Ok(dir.to_path_buf());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() && path.join(MAP_XML_PATH).is_file() {
            return Ok(path);
        }
    }
    Err(MigrateError::Archive(format!("{MAP_XML_PATH} not found in {}", dir.display())))
}

fn find_image(images_dir: &Path) -> Result<PathBuf> {
    let missing = || MigrateError::Archive(format!("no floor image in {}", images_dir.display()));
    if !images_dir.is_dir() {
        return Err(missing());
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(images_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    // jpg first, as exported by Catalyst Center, then by name
    candidates.sort_by_key(|path| {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let rank = IMAGE_EXTENSIONS.iter().position(|e| *e == ext).unwrap_or(usize::MAX);
        (rank, path.clone())
    });
    candidates.into_iter().next().ok_or_else(missing)
}

/// Building coordinates and planned APs from `MapsImportExport.xml`.
///
/// Elements are matched on their local name so namespace prefixes do not
/// matter.
pub fn parse_map_xml(xml: &str) -> Result<(Option<Coordinates>, Vec<SourceDevice>)> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| MigrateError::Archive(format!("invalid map XML: {e}")))?;

    let civic_location = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "CivicAddress")
        .find_map(|n| {
            let lat = n.attribute("latitude")?.trim().parse().ok()?;
            let lng = n.attribute("longitude")?.trim().parse().ok()?;
            Some(Coordinates { lat, lng })
        });

    let devices = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "PlannedAp")
        .map(|n| {
            SourceDevice::new(
                n.attribute("macAddress").unwrap_or_default(),
                n.attribute("name").map(str::to_string),
            )
        })
        .collect();

    Ok((civic_location, devices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Cursor;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ns2:MapsImportExport xmlns:ns2="http://importexport.cisco.com/1.0">
  <ns2:Area name="Paris">
    <ns2:Building name="B1">
      <ns2:CivicAddress latitude="48.8566" longitude="2.3522" address="1 Rue de Rivoli"/>
      <ns2:Floor name="Floor 1">
        <ns2:PlannedAp name="AP-1" macAddress="AA:BB:CC:00:00:01" x="10" y="20"/>
        <ns2:PlannedAp name="AP-2" macAddress="aa:bb:cc:00:00:02"/>
        <ns2:PlannedAp name="AP-3"/>
      </ns2:Floor>
    </ns2:Building>
  </ns2:Area>
</ns2:MapsImportExport>"#;

    fn targz(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(Cursor::new(&mut tar_bytes));
            for (path, data) in files {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, path, *data).unwrap();
            }
            builder.finish().unwrap();
        }
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        std::io::Write::write_all(&mut gz, &tar_bytes).unwrap();
        gz.finish().unwrap()
    }

    #[test]
    fn test_parse_map_xml() {
        let (civic, devices) = parse_map_xml(XML).unwrap();
        assert_eq!(civic, Some(Coordinates { lat: 48.8566, lng: 2.3522 }));
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].name.as_deref(), Some("AP-1"));
        assert_eq!(devices[1].mac, devices[1].raw_mac.parse().ok());
        assert!(devices[1].mac.is_some());
        assert_eq!(devices[2].mac, None);
    }

    #[test]
    fn test_parse_map_xml_without_civic_address() {
        let (civic, devices) = parse_map_xml("<MapsImportExport><Floor/></MapsImportExport>").unwrap();
        assert_eq!(civic, None);
        assert!(devices.is_empty());
    }

    #[test]
    fn test_invalid_xml_is_archive_error() {
        assert!(matches!(parse_map_xml("<unclosed"), Err(MigrateError::Archive(_))));
    }

    #[test]
    fn test_extract_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("Global_Paris_B1_Floor_1.tar.gz");
        std::fs::write(
            &archive,
            targz(&[("images/floor1.jpg", b"jpeg-bytes"), (MAP_XML_PATH, XML.as_bytes())]),
        )
        .unwrap();

        let extracted = extract(&archive).unwrap();
        assert_eq!(extracted, dir.path().join("Global_Paris_B1_Floor_1"));
        // the archive itself is left on disk
        assert!(archive.exists());

        let floor = load(&extracted).unwrap();
        assert_eq!(floor.image_name, "floor1.jpg");
        assert_eq!(floor.image_base64, BASE64.encode(b"jpeg-bytes"));
        assert_eq!(floor.devices.len(), 3);
    }

    #[test]
    fn test_load_finds_nested_root() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("nested.tar.gz");
        std::fs::write(
            &archive,
            targz(&[
                ("export-1/images/floor.PNG", b"png-bytes"),
                ("export-1/xmlDir/MapsImportExport.xml", XML.as_bytes()),
            ]),
        )
        .unwrap();

        let floor = load(&extract(&archive).unwrap()).unwrap();
        assert!(floor.root.ends_with("export-1"));
        assert_eq!(floor.image_name, "floor.PNG");
    }

    #[test]
    fn test_missing_image_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("noimage.tar.gz");
        std::fs::write(&archive, targz(&[(MAP_XML_PATH, XML.as_bytes())])).unwrap();

        let err = load(&extract(&archive).unwrap()).unwrap_err();
        assert!(matches!(err, MigrateError::Archive(ref m) if m.contains("no floor image")));
    }

    #[test]
    fn test_corrupt_archive_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("corrupt.tar.gz");
        std::fs::write(&archive, b"this is not gzip").unwrap();
        assert!(matches!(extract(&archive), Err(MigrateError::Archive(_))));
    }

    #[test]
    fn test_extraction_dir_names() {
        assert_eq!(extraction_dir(Path::new("/x/a.tar.gz")), PathBuf::from("/x/a"));
        assert_eq!(extraction_dir(Path::new("/x/a.tgz")), PathBuf::from("/x/a"));
        assert_eq!(extraction_dir(Path::new("/x/a")), PathBuf::from("/x/a.d"));
    }
}
