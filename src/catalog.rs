use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::IndexedRandom;
use rand::Rng;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagEntry {
    pub country: String,
    pub image_url: String,
}

/// Every flag the bot can ask about. Loaded once, never changed afterwards.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<FlagEntry>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Catalog> {
        let file = File::open(path)
            .with_context(|| format!("could not open flag data at {}", path.display()))?;

        Catalog::from_reader(file)
            .with_context(|| format!("could not read flag data at {}", path.display()))
    }

    /// Reads `country, <anything>, image url` rows. There is no header row,
    /// columns past the third are ignored and shorter rows are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Catalog> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries = vec![];

        for record in reader.records() {
            let record = record?;

            if let (Some(country), Some(image_url)) = (record.get(0), record.get(2)) {
                entries.push(FlagEntry {
                    country: country.to_string(),
                    image_url: image_url.to_string(),
                });
            }
        }

        Ok(Catalog { entries })
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&FlagEntry> {
        self.entries.choose(rng)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<FlagEntry>> for Catalog {
    fn from(entries: Vec<FlagEntry>) -> Self {
        Catalog { entries }
    }
}
