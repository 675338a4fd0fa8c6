use crate::models::{Extraction, KeyMaterial, MrzLine};
use log::debug;

// Document number + check digit, birth date + check digit, expiry date +
// check digit, as (offset, length) into the second TD3 line.
const BAC_SPANS: [(usize, usize); 3] = [(0, 10), (13, 7), (21, 7)];

pub struct MrzValidator;

impl MrzValidator {
    /// Trimmed lines of `text` that are full MRZ lines, in order.
    pub fn mrz_lines(text: &str) -> Vec<MrzLine> {
        text.lines().map(str::trim).filter_map(MrzLine::parse).collect()
    }

    /// Reduces recognized text to BAC key material.
    ///
    /// The last MRZ line is taken as the second line of the zone. Text
    /// without any MRZ line, or whose carved key fails the length or `P<`
    /// gate, yields `NotFound`.
    pub fn extract_key_material(text: &str) -> Extraction {
        let lines = Self::mrz_lines(text);
        debug!("Filtered MRZ lines: {:?}", lines);

        let line = match lines.last() {
            Some(line) => line.as_str(),
            None => return Extraction::NotFound,
        };

        let carved: String = BAC_SPANS
            .iter()
            .map(|&(start, len)| &line[start..start + len])
            .collect();

        match KeyMaterial::new(carved) {
            Some(key) => Extraction::Found(key),
            None => {
                debug!("BAC substring rejected for line {}", line);
                Extraction::NotFound
            }
        }
    }
}
