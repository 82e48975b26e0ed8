/*!
Construction d'archives de cartes Catalyst Center pour les tests

Produit le même tar.gz qu'un export réel:
- `images/<image>`
- `xmlDir/MapsImportExport.xml` avec `CivicAddress` et des `PlannedAp`
*/

use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

/// Octets de début d'un JPEG, suffisant pour un upload simulé
pub const FAKE_JPEG: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00fake-floor-image";

pub struct MapArchiveBuilder {
    image_name: String,
    image: Vec<u8>,
    civic_address: Option<(f64, f64)>,
    planned_aps: Vec<(String, Option<String>)>,
}

impl MapArchiveBuilder {
    pub fn new() -> Self {
        Self {
            image_name: "floor.jpg".to_string(),
            image: FAKE_JPEG.to_vec(),
            civic_address: None,
            planned_aps: Vec::new(),
        }
    }

    pub fn image(mut self, name: &str, bytes: &[u8]) -> Self {
        self.image_name = name.to_string();
        self.image = bytes.to_vec();
        self
    }

    pub fn civic_address(mut self, lat: f64, lng: f64) -> Self {
        self.civic_address = Some((lat, lng));
        self
    }

    /// AP planifié sur l'étage; une MAC vide omet l'attribut `macAddress`
    pub fn planned_ap(mut self, name: &str, mac: &str) -> Self {
        let mac = (!mac.is_empty()).then(|| mac.to_string());
        self.planned_aps.push((name.to_string(), mac));
        self
    }

    pub fn xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <ns2:MapsImportExport xmlns:ns2=\"http://importexport.cisco.com/1.0\">\n\
             <ns2:Building name=\"Test Building\">\n",
        );
        if let Some((lat, lng)) = self.civic_address {
            xml.push_str(&format!(
                "<ns2:CivicAddress latitude=\"{lat}\" longitude=\"{lng}\" address=\"Test address\"/>\n"
            ));
        }
        xml.push_str(&format!("<ns2:Floor name=\"Floor\" imageName=\"{}\">\n", self.image_name));
        for (name, mac) in &self.planned_aps {
            match mac {
                Some(mac) => xml.push_str(&format!("<ns2:PlannedAp name=\"{name}\" macAddress=\"{mac}\"/>\n")),
                None => xml.push_str(&format!("<ns2:PlannedAp name=\"{name}\"/>\n")),
            }
        }
        xml.push_str("</ns2:Floor>\n</ns2:Building>\n</ns2:MapsImportExport>\n");
        xml
    }

    /// Archive tar.gz complète
    pub fn build(&self) -> Result<Vec<u8>> {
        let xml = self.xml();
        let image_path = format!("images/{}", self.image_name);
        let files: [(&str, &[u8]); 2] = [
            (image_path.as_str(), &self.image),
            ("xmlDir/MapsImportExport.xml", xml.as_bytes()),
        ];

        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, data)?;
        }
        let mut gz = builder.into_inner()?;
        gz.flush()?;
        Ok(gz.finish()?)
    }
}

impl Default for MapArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}
