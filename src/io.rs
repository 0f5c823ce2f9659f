//! FASTA loading, the concrete realization of the out-of-scope "FASTA
//! file I/O" collaborator (spec.md §1). Modeled on the teacher crate's
//! bin targets, which read templates the same way via `needletail`.

use needletail::parse_fastx_file;

use crate::error::{CoreError, CoreResult};
use crate::primer::Primer;
use crate::template::Template;

/// Load a single primer sequence (the first record) from a FASTA file.
pub fn load_primer(path: &str, concentration: f64, id: &str) -> CoreResult<Primer> {
    let mut reader = parse_fastx_file(path).map_err(|e| CoreError::Io(e.to_string()))?;
    let record = reader
        .next()
        .ok_or_else(|| CoreError::Io(format!("'{path}' contains no sequences")))?
        .map_err(|e| CoreError::Io(e.to_string()))?;
    Primer::new(id, &record.seq(), concentration)
}

/// Load every record of a FASTA file as a `Template`, keyed by its
/// record id.
pub fn load_templates(path: &str) -> CoreResult<Vec<Template>> {
    let mut reader = parse_fastx_file(path).map_err(|e| CoreError::Io(e.to_string()))?;
    let mut templates = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| CoreError::Io(e.to_string()))?;
        let id = String::from_utf8_lossy(record.id()).into_owned();
        templates.push(Template::new(id, &record.seq()));
    }
    if templates.is_empty() {
        return Err(CoreError::Io(format!("'{path}' contains no sequences")));
    }
    Ok(templates)
}
