//! Category taxonomy
//!
//! The seven top-level document categories, their subcategories, and the bidirectional
//! mapping to backend type codes. Everything is derived from `CATEGORY_TABLE`, the single
//! canonical table; the forward (`Category::code`) and inverse (`Category::from_code`)
//! directions are both lookups into it, so they cannot drift apart.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::Document;

/// Top-level document category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fiscal,
    Accounting,
    Labor,
    Legal,
    Operational,
    Certificates,
    Templates,
}

/// One row of the canonical category table
#[derive(Debug)]
pub struct CategoryEntry {
    pub category: Category,
    /// Frontend identifier, also used in node keys
    pub slug: &'static str,
    /// Backend type code
    pub code: &'static str,
    pub label: &'static str,
    /// Visual color token
    pub color: &'static str,
    /// (slug, label) pairs
    pub subcategories: &'static [(&'static str, &'static str)],
}

/// Indexed by `Category as usize`.
pub static CATEGORY_TABLE: [CategoryEntry; 7] = [
    CategoryEntry {
        category: Category::Fiscal,
        slug: "fiscal",
        code: "NOTA_FISCAL",
        label: "Fiscal",
        color: "blue",
        subcategories: &[
            ("nfe", "NF-e"),
            ("nfse", "NFS-e"),
            ("guias", "Guias de impostos"),
            ("sped", "SPED"),
            ("apuracoes", "Apurações"),
        ],
    },
    CategoryEntry {
        category: Category::Accounting,
        slug: "accounting",
        code: "CONTABIL",
        label: "Contábil",
        color: "green",
        subcategories: &[
            ("balancetes", "Balancetes"),
            ("dre", "DRE"),
            ("balanco", "Balanço patrimonial"),
            ("livros", "Livros contábeis"),
            ("conciliacoes", "Conciliações"),
        ],
    },
    CategoryEntry {
        category: Category::Labor,
        slug: "labor",
        code: "TRABALHISTA",
        label: "Trabalhista",
        color: "orange",
        subcategories: &[
            ("folha", "Folha de pagamento"),
            ("ferias", "Férias"),
            ("rescisoes", "Rescisões"),
            ("fgts", "FGTS"),
            ("esocial", "eSocial"),
        ],
    },
    CategoryEntry {
        category: Category::Legal,
        slug: "legal",
        code: "JURIDICO",
        label: "Jurídico",
        color: "purple",
        subcategories: &[
            ("contratos", "Contratos"),
            ("alteracoes", "Alterações contratuais"),
            ("procuracoes", "Procurações"),
            ("atas", "Atas"),
        ],
    },
    CategoryEntry {
        category: Category::Operational,
        slug: "operational",
        code: "OPERACIONAL",
        label: "Operacional",
        color: "gray",
        subcategories: &[
            ("comprovantes", "Comprovantes"),
            ("extratos", "Extratos bancários"),
            ("orcamentos", "Orçamentos"),
            ("relatorios", "Relatórios"),
        ],
    },
    CategoryEntry {
        category: Category::Certificates,
        slug: "certificates",
        code: "CERTIDAO",
        label: "Certidões",
        color: "teal",
        subcategories: &[
            ("cnd", "Certidões negativas"),
            ("alvaras", "Alvarás"),
            ("certificado_digital", "Certificado digital"),
            ("licencas", "Licenças"),
        ],
    },
    CategoryEntry {
        category: Category::Templates,
        slug: "templates",
        code: "MODELO",
        label: "Modelos",
        color: "yellow",
        subcategories: &[
            ("declaracoes", "Declarações"),
            ("formularios", "Formulários"),
            ("planilhas", "Planilhas"),
        ],
    },
];

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Fiscal,
        Category::Accounting,
        Category::Labor,
        Category::Legal,
        Category::Operational,
        Category::Certificates,
        Category::Templates,
    ];

    pub fn entry(self) -> &'static CategoryEntry {
        &CATEGORY_TABLE[self as usize]
    }

    pub fn slug(self) -> &'static str {
        self.entry().slug
    }

    /// Backend type code for this category
    pub fn code(self) -> &'static str {
        self.entry().code
    }

    pub fn label(self) -> &'static str {
        self.entry().label
    }

    pub fn color(self) -> &'static str {
        self.entry().color
    }

    /// Inverse of [`Category::code`]
    pub fn from_code(code: &str) -> AppResult<Self> {
        CATEGORY_TABLE
            .iter()
            .find(|entry| entry.code.eq_ignore_ascii_case(code.trim()))
            .map(|entry| entry.category)
            .ok_or_else(|| AppError::UnknownCategoryCode(code.to_string()))
    }

    pub fn has_subcategory(self, subcategory: &str) -> bool {
        self.entry()
            .subcategories
            .iter()
            .any(|(slug, _)| *slug == subcategory)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        CATEGORY_TABLE
            .iter()
            .find(|entry| entry.slug == normalized)
            .map(|entry| entry.category)
            .ok_or_else(|| AppError::UnknownTaxonomyNode(s.to_string()))
    }
}

/// Key of a taxonomy node: `"fiscal"` or `"fiscal:nfse"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn category(category: Category) -> Self {
        NodeKey(category.slug().to_string())
    }

    pub fn subcategory(category: Category, subcategory: &str) -> Self {
        NodeKey(format!("{}:{}", category.slug(), subcategory))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// A category or subcategory node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyNode {
    pub key: NodeKey,
    pub category: Category,
    pub subcategory: Option<&'static str>,
    pub label: &'static str,
}

/// The static category tree
#[derive(Debug)]
pub struct Taxonomy {
    nodes: Vec<TaxonomyNode>,
}

static TAXONOMY: OnceLock<Taxonomy> = OnceLock::new();

impl Taxonomy {
    /// Process-wide taxonomy, built once from `CATEGORY_TABLE`
    pub fn global() -> &'static Taxonomy {
        TAXONOMY.get_or_init(Taxonomy::build)
    }

    fn build() -> Self {
        let mut nodes = Vec::new();
        for entry in CATEGORY_TABLE.iter() {
            nodes.push(TaxonomyNode {
                key: NodeKey::category(entry.category),
                category: entry.category,
                subcategory: None,
                label: entry.label,
            });
            for &(slug, label) in entry.subcategories {
                nodes.push(TaxonomyNode {
                    key: NodeKey::subcategory(entry.category, slug),
                    category: entry.category,
                    subcategory: Some(slug),
                    label,
                });
            }
        }
        Taxonomy { nodes }
    }

    pub fn nodes(&self) -> &[TaxonomyNode] {
        &self.nodes
    }

    pub fn subcategories(&self, category: Category) -> impl Iterator<Item = &TaxonomyNode> {
        self.nodes
            .iter()
            .filter(move |node| node.category == category && node.subcategory.is_some())
    }

    pub fn node(&self, key: &NodeKey) -> Option<&TaxonomyNode> {
        self.nodes.iter().find(|node| &node.key == key)
    }

    /// Resolve a (category, subcategory) pair to an existing node.
    pub fn resolve(&self, category: Category, subcategory: Option<&str>) -> AppResult<&TaxonomyNode> {
        let key = match subcategory.map(str::trim).filter(|s| !s.is_empty()) {
            Some(sub) => NodeKey::subcategory(category, sub),
            None => NodeKey::category(category),
        };
        self.node(&key)
            .ok_or_else(|| AppError::UnknownTaxonomyNode(key.to_string()))
    }

    /// Count documents per node. Every taxonomy node is present, with 0 when unused.
    /// Subcategories sent by the server that the taxonomy does not know are still counted
    /// under their own key.
    pub fn count_by_node(&self, documents: &[Document]) -> BTreeMap<NodeKey, usize> {
        let mut counts: BTreeMap<NodeKey, usize> =
            self.nodes.iter().map(|node| (node.key.clone(), 0)).collect();

        for doc in documents {
            *counts.entry(NodeKey::category(doc.category)).or_insert(0) += 1;
            if let Some(sub) = doc.subcategory.as_deref().filter(|s| !s.is_empty()) {
                *counts
                    .entry(NodeKey::subcategory(doc.category, sub))
                    .or_insert(0) += 1;
            }
        }

        counts
    }
}
