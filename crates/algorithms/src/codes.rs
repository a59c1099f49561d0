//! External class-code encoding of binary urban layers
//!
//! Filters work on {0,1} masks. Persisted layers use the land-cover class
//! scheme instead: `urban` (24) for urban cells, `0` otherwise, and
//! `nodata` (27) in classified inputs for cells without a valid class.

use serde::{Deserialize, Serialize};
use urbano_core::{Error, Raster, RasterStack, Result};

/// Class codes of the external encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCodes {
    pub urban: u8,
    pub nodata: u8,
}

impl Default for ClassCodes {
    fn default() -> Self {
        Self {
            urban: 24,
            nodata: 27,
        }
    }
}

impl ClassCodes {
    /// Both codes must be non-zero and distinct
    pub fn validate(&self) -> Result<()> {
        if self.urban == 0 || self.nodata == 0 || self.urban == self.nodata {
            return Err(Error::InvalidParameter {
                name: "class_codes",
                value: format!("urban={}, nodata={}", self.urban, self.nodata),
                reason: "codes must be non-zero and distinct".into(),
            });
        }
        Ok(())
    }

    /// Map a binary mask to {0, urban}
    pub fn encode(&self, binary: &Raster<u8>) -> Raster<u8> {
        let urban = self.urban;
        binary.map(move |v| if v != 0 { urban } else { 0 })
    }

    /// Map a classified layer to {0,1}; anything but the urban code,
    /// the no-data code included, is not urban
    pub fn decode(&self, classified: &Raster<u8>) -> Raster<u8> {
        let urban = self.urban;
        classified.map(move |v| u8::from(v == urban))
    }

    /// Cells holding the no-data code
    pub fn nodata_mask(&self, classified: &Raster<u8>) -> Raster<u8> {
        let nodata = self.nodata;
        classified.map(move |v| u8::from(v == nodata))
    }

    pub fn encode_stack(&self, stack: &RasterStack<u8>) -> Result<RasterStack<u8>> {
        let encoded = stack.map_layers(|_, layer| self.encode(layer))?;
        Ok(match stack.provenance() {
            Some(p) => encoded.with_provenance(p.clone()),
            None => encoded,
        })
    }

    pub fn decode_stack(&self, stack: &RasterStack<u8>) -> Result<RasterStack<u8>> {
        let decoded = stack.map_layers(|_, layer| self.decode(layer))?;
        Ok(match stack.provenance() {
            Some(p) => decoded.with_provenance(p.clone()),
            None => decoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let codes = ClassCodes::default();
        let binary = Raster::from_vec(vec![0u8, 1, 1, 0], 2, 2).unwrap();
        let encoded = codes.encode(&binary);
        assert_eq!(encoded.data().iter().copied().collect::<Vec<_>>(), vec![0, 24, 24, 0]);
        assert_eq!(codes.decode(&encoded), binary);
    }

    #[test]
    fn test_nodata_decodes_as_not_urban() {
        let codes = ClassCodes::default();
        let classified = Raster::from_vec(vec![27u8, 24, 3, 0], 2, 2).unwrap();
        let decoded = codes.decode(&classified);
        assert_eq!(decoded.data().iter().copied().collect::<Vec<_>>(), vec![0, 1, 0, 0]);
        assert_eq!(codes.nodata_mask(&classified).count_set(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(ClassCodes::default().validate().is_ok());
        assert!(ClassCodes { urban: 24, nodata: 24 }.validate().is_err());
        assert!(ClassCodes { urban: 0, nodata: 27 }.validate().is_err());
    }
}
