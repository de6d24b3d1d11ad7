//! SDMX-JSON structure messages: dataflows, data structure definitions and codelists.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::model::{Code, CodelistSummary, Dataflow, Dimension};
use crate::util::id_from_urn;

/// Localized text as SDMX-JSON ships it: a default `name` plus a `names` map.
///
/// Without `name` or an `en` entry, the language that sorts first is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Localized {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    names: BTreeMap<String, String>,
}

impl Localized {
    fn text(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.names.get("en").cloned())
            .or_else(|| self.names.values().next().cloned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LocalizedDescription {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    descriptions: BTreeMap<String, String>,
}

impl LocalizedDescription {
    fn text(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.descriptions.get("en").cloned())
            .or_else(|| self.descriptions.values().next().cloned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StructureMessage {
    data: StructureData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructureData {
    #[serde(default)]
    dataflows: Vec<DataflowDef>,
    #[serde(default)]
    data_structures: Vec<DataStructureDef>,
    #[serde(default)]
    codelists: Vec<CodelistDef>,
    #[serde(default)]
    concept_schemes: Vec<ConceptSchemeDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataflowDef {
    id: String,
    #[serde(default, rename = "agencyID")]
    agency_id: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(flatten)]
    name: Localized,
    #[serde(default)]
    structure: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataStructureDef {
    id: String,
    data_structure_components: Components,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Components {
    dimension_list: DimensionList,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DimensionList {
    #[serde(default)]
    dimensions: Vec<ComponentDef>,
    // SDMX-JSON 2.0 has a single `timeDimension`; 1.0 used a `timeDimensions` array.
    #[serde(default)]
    time_dimension: Option<ComponentDef>,
    #[serde(default)]
    time_dimensions: Vec<ComponentDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComponentDef {
    id: String,
    #[serde(default)]
    position: Option<usize>,
    #[serde(default)]
    concept_identity: Option<String>,
    #[serde(default)]
    local_representation: Option<Representation>,
}

#[derive(Debug, Clone, Deserialize)]
struct Representation {
    #[serde(default)]
    enumeration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CodelistDef {
    id: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(flatten)]
    name: Localized,
    #[serde(default)]
    codes: Vec<CodeDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct CodeDef {
    id: String,
    #[serde(flatten)]
    name: Localized,
    #[serde(flatten)]
    description: LocalizedDescription,
}

#[derive(Debug, Clone, Deserialize)]
struct ConceptSchemeDef {
    #[serde(default)]
    concepts: Vec<ConceptDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptDef {
    id: String,
    #[serde(default)]
    core_representation: Option<Representation>,
}

impl StructureMessage {
    pub(crate) fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub(crate) fn dataflows(&self) -> Vec<Dataflow> {
        self.data
            .dataflows
            .iter()
            .map(|df| Dataflow {
                id: df.id.clone(),
                agency: df.agency_id.clone().unwrap_or_default(),
                version: df.version.clone().unwrap_or_default(),
                description: df.name.text(),
            })
            .collect()
    }

    /// Dimensions of the structure used by `dataset`, in key order with time last.
    ///
    /// `None` when the message carries no matching data structure.
    pub(crate) fn dimensions(&self, dataset: &str) -> Option<Vec<Dimension>> {
        let dsd = self.data_structure_for(dataset)?;
        let list = &dsd.data_structure_components.dimension_list;

        let mut components: Vec<&ComponentDef> = list.dimensions.iter().collect();
        components.sort_by_key(|c| c.position.unwrap_or(usize::MAX));

        let mut out: Vec<Dimension> = components
            .into_iter()
            .map(|c| Dimension {
                id: c.id.clone(),
                position: 0,
                codelist: self.resolve_codelist(c),
            })
            .collect();
        out.extend(
            list.time_dimension
                .iter()
                .chain(list.time_dimensions.iter())
                .map(|c| Dimension {
                    id: c.id.clone(),
                    position: 0,
                    codelist: None,
                }),
        );
        for (i, d) in out.iter_mut().enumerate() {
            d.position = i;
        }
        Some(out)
    }

    fn data_structure_for(&self, dataset: &str) -> Option<&DataStructureDef> {
        let by_flow = self
            .data
            .dataflows
            .iter()
            .find(|df| df.id == dataset)
            .and_then(|df| df.structure.as_deref())
            .and_then(id_from_urn)
            .and_then(|id| self.data.data_structures.iter().find(|d| d.id == id));
        let dsd_id = format!("DSD_{dataset}");
        by_flow
            .or_else(|| self.data.data_structures.iter().find(|d| d.id == dsd_id))
            .or_else(|| match self.data.data_structures.as_slice() {
                [only] => Some(only),
                _ => None,
            })
    }

    /// Local representation, then the concept's core representation, then `CL_<ID>`.
    fn resolve_codelist(&self, component: &ComponentDef) -> Option<String> {
        let local = component
            .local_representation
            .as_ref()
            .and_then(|r| r.enumeration.as_deref())
            .and_then(id_from_urn);
        if let Some(id) = local.filter(|id| self.has_codelist(id)) {
            return Some(id.to_string());
        }

        let core = component
            .concept_identity
            .as_deref()
            .and_then(concept_id_from_urn)
            .and_then(|cid| {
                self.data
                    .concept_schemes
                    .iter()
                    .flat_map(|s| s.concepts.iter())
                    .find(|c| c.id == cid)
            })
            .and_then(|c| c.core_representation.as_ref())
            .and_then(|r| r.enumeration.as_deref())
            .and_then(id_from_urn);
        if let Some(id) = core.filter(|id| self.has_codelist(id)) {
            return Some(id.to_string());
        }

        let guess = format!("CL_{}", component.id);
        self.has_codelist(&guess).then_some(guess)
    }

    fn has_codelist(&self, id: &str) -> bool {
        self.data.codelists.iter().any(|cl| cl.id == id)
    }

    pub(crate) fn codes(&self, codelist_id: &str) -> Option<Vec<Code>> {
        let cl = self.data.codelists.iter().find(|cl| cl.id == codelist_id)?;
        Some(
            cl.codes
                .iter()
                .map(|c| Code {
                    code_id: c.id.clone(),
                    name: c.name.text(),
                    description: c.description.text(),
                })
                .collect(),
        )
    }

    pub(crate) fn codelists_summary(&self) -> Vec<CodelistSummary> {
        self.data
            .codelists
            .iter()
            .map(|cl| CodelistSummary {
                codelist_id: cl.id.clone(),
                name: cl.name.text(),
                version: cl.version.clone().unwrap_or_default(),
                n_codes: cl.codes.len(),
            })
            .collect()
    }
}

/// `...ConceptScheme=IMF:CS_WEO(1.0).COUNTRY` gives `COUNTRY`.
fn concept_id_from_urn(urn: &str) -> Option<&str> {
    let (_, tail) = urn.rsplit_once(')')?;
    tail.strip_prefix('.').filter(|s| !s.is_empty())
}
