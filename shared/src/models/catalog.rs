//! Catalog models and category name resolution
//!
//! Areas, bags and waste categories are owned by an external catalog
//! service; this crate treats them as read-only inputs. What lives here is
//! the canonical orderings used by the paper report form and the fuzzy
//! resolver that maps free-text category names onto catalog ids.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// A hospital area (service) that produces waste bags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: i32,
    pub name: String,
    pub active: bool,
}

/// A bag preset: color/size bound to one waste category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bag {
    pub id: i32,
    pub name: String,
    pub category_id: Option<i32>,
    pub active: bool,
}

/// Canonical waste classification ("tipo de desecho")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteCategory {
    pub id: i32,
    pub name: String,
    pub active: bool,
}

/// Fixed area ordering of the regulatory report form. Rows are printed in
/// exactly this order; areas missing from the live catalog are omitted.
pub const CANONICAL_AREAS: [&str; 15] = [
    "Emergencia",
    "Quirófano",
    "Hospitalización",
    "Consulta Externa",
    "Laboratorio",
    "Imagenología",
    "Farmacia",
    "Pediatría",
    "Ginecología y Obstetricia",
    "Neonatología",
    "Odontología",
    "Cocina",
    "Lavandería",
    "Administración",
    "Bodega",
];

/// Fixed column titles of the report form, with the subtitle printed under
/// each. Column order matches the physical paper form and must not change.
pub const REPORT_COLUMNS: [(&str, &str); 5] = [
    ("Desechos Infecciosos", "Fundas rojas"),
    ("Desechos Cortopunzantes", "Guardianes"),
    ("Desechos Anatomopatológicos", "Fundas rojas"),
    ("Desechos Especiales", "Fundas negras"),
    ("Desecho Común", "Fundas negras"),
];

/// Title of the fallback column unresolved categories are folded into.
pub const COMMON_COLUMN_TITLE: &str = "Desecho Común";

/// Normalize a name for matching: trim, lowercase, strip Spanish diacritics.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Alias substrings per canonical column title, keys already normalized.
/// Loaded once and reused for every resolution.
fn synonym_table() -> &'static HashMap<&'static str, &'static [&'static str]> {
    static TABLE: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        map.insert(
            "desechos infecciosos",
            &["infeccios", "biologic", "biopeligros"][..],
        );
        map.insert(
            "desechos cortopunzantes",
            &["cortopunzante", "corto punzante", "punzante", "aguja"][..],
        );
        map.insert(
            "desechos anatomopatologicos",
            &["anatomopatologic", "anatomic", "patologic"][..],
        );
        map.insert(
            "desechos especiales",
            &["especial", "farmaceutic", "quimic"][..],
        );
        map.insert("desecho comun", &["comun", "ordinario", "general"][..]);
        map
    })
}

/// Resolves canonical column titles to live catalog ids.
///
/// Built once per request from the catalog snapshot; catalog names are
/// normalized up front so each `resolve` call is pure lookup work.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    // (id, normalized name) in catalog iteration order; order is the
    // tie-break when several entries match a synonym.
    entries: Vec<(i32, String)>,
}

impl CategoryResolver {
    pub fn new(catalog: &[WasteCategory]) -> Self {
        let entries = catalog
            .iter()
            .map(|c| (c.id, normalize_name(&c.name)))
            .collect();
        Self { entries }
    }

    /// Resolve a canonical title to a catalog id: exact normalized match
    /// first, then the first catalog entry whose normalized name contains
    /// any configured synonym of the title. `None` means unresolved; the
    /// caller decides the fallback policy.
    pub fn resolve(&self, title: &str) -> Option<i32> {
        let wanted = normalize_name(title);

        if let Some((id, _)) = self.entries.iter().find(|(_, name)| *name == wanted) {
            return Some(*id);
        }

        let aliases = synonym_table().get(wanted.as_str())?;
        for (id, name) in &self.entries {
            if aliases.iter().any(|alias| name.contains(alias)) {
                return Some(*id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: i32, name: &str) -> WasteCategory {
        WasteCategory {
            id,
            name: name.to_string(),
            active: true,
        }
    }

    #[test]
    fn normalizes_diacritics_and_case() {
        assert_eq!(normalize_name("  Quirófano "), "quirofano");
        assert_eq!(normalize_name("HOSPITALIZACIÓN"), "hospitalizacion");
        assert_eq!(normalize_name("Año"), "ano");
    }

    #[test]
    fn exact_match_ignores_accents() {
        let resolver = CategoryResolver::new(&[
            cat(1, "Desechos Infecciosos"),
            cat(2, "Desecho Comun"),
        ]);
        assert_eq!(resolver.resolve("desechos infecciosos"), Some(1));
        assert_eq!(resolver.resolve("Desecho Común"), Some(2));
    }

    #[test]
    fn synonym_substring_match() {
        // Catalog spells things its own way; synonyms bridge the gap.
        let resolver = CategoryResolver::new(&[
            cat(7, "Residuos Biológicos Peligrosos"),
            cat(8, "Basura Ordinaria"),
        ]);
        assert_eq!(resolver.resolve("Desechos Infecciosos"), Some(7));
        assert_eq!(resolver.resolve("Desecho Común"), Some(8));
    }

    #[test]
    fn catalog_order_breaks_ties() {
        // Both entries contain "infeccios"; the first in catalog order wins.
        let resolver = CategoryResolver::new(&[
            cat(3, "Infecciosos hospitalarios"),
            cat(4, "Infecciosos de laboratorio"),
        ]);
        assert_eq!(resolver.resolve("Desechos Infecciosos"), Some(3));
    }

    #[test]
    fn unresolved_returns_none() {
        let resolver = CategoryResolver::new(&[cat(1, "Chatarra Metálica")]);
        assert_eq!(resolver.resolve("Desechos Infecciosos"), None);
        // Unknown title has no synonym entry either.
        assert_eq!(resolver.resolve("Desechos Radiactivos"), None);
    }

    #[test]
    fn canonical_lists_have_fixed_shape() {
        assert_eq!(CANONICAL_AREAS.len(), 15);
        assert_eq!(REPORT_COLUMNS.len(), 5);
        assert_eq!(REPORT_COLUMNS[0].0, "Desechos Infecciosos");
        assert_eq!(REPORT_COLUMNS[4].0, COMMON_COLUMN_TITLE);
    }
}
