//! Dataset loader
//!
//! Out-of-band companion to the API server: uploads a Turtle dataset
//! into the Fuseki dataset and verifies what landed, class by class.
//! Run once at provisioning time (`edugraph load data/ontology.ttl`).

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::ontology::{ONT, RDFS};
use crate::store::SparqlStore;

/// Class families reported by the post-load verification.
const ENTITY_CLASSES: &[(&str, &str)] = &[
    ("Personnes", "Personne"),
    ("Universites", "Universite"),
    ("Specialites", "Specialite"),
    ("Cours", "Cours"),
    ("Competences", "Competence"),
    ("ProjetsAcademiques", "ProjetAcademique"),
    ("RessourcesPedagogiques", "RessourcePedagogique"),
    ("TechnologiesEducatives", "TechnologieEducative"),
    ("Evaluations", "Evaluation"),
    ("OrientationsAcademiques", "OrientationAcademique"),
];

/// Per-family count from the verification pass.
#[derive(Debug, Clone)]
pub struct ClassCount {
    pub label: &'static str,
    pub count: u64,
}

/// Loads and verifies RDF data against one Fuseki dataset.
pub struct Loader {
    store: SparqlStore,
}

impl Loader {
    pub fn new(store: SparqlStore) -> Self {
        Self { store }
    }

    /// Check that Fuseki answers at all.
    pub async fn verify_connection(&self) -> Result<()> {
        self.store.ping().await.map_err(Error::Store)?;
        tracing::info!(endpoint = %self.store.endpoint(), "Fuseki connection OK");
        Ok(())
    }

    /// Wipe the dataset (`CLEAR ALL`).
    pub async fn clear_dataset(&self) -> Result<()> {
        self.store.update("CLEAR ALL").await.map_err(Error::Store)?;
        tracing::info!("dataset cleared");
        Ok(())
    }

    /// Upload a Turtle file into the dataset.
    pub async fn upload_file(&self, path: &Path) -> Result<()> {
        let turtle = tokio::fs::read_to_string(path).await?;
        tracing::info!(file = %path.display(), bytes = turtle.len(), "uploading dataset");

        self.store
            .upload_turtle(turtle)
            .await
            .map_err(Error::Store)?;

        // Give Fuseki a moment to index before verification queries.
        tokio::time::sleep(Duration::from_secs(3)).await;
        tracing::info!("upload accepted");
        Ok(())
    }

    /// Count individuals per class family, subclasses included.
    pub async fn verify_counts(&self) -> Result<Vec<ClassCount>> {
        let mut counts = Vec::with_capacity(ENTITY_CLASSES.len());

        for &(label, class) in ENTITY_CLASSES {
            let query = format!(
                r#"PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <{RDFS}>
SELECT (COUNT(DISTINCT ?s) as ?count) WHERE {{
    ?s a ?type .
    ?type rdfs:subClassOf* <{ONT}{class}> .
}}"#
            );

            let rows = self.store.query(&query).await.map_err(Error::Store)?;
            let count = rows
                .first()
                .and_then(|row| row.get("count"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);

            counts.push(ClassCount { label, count });
        }

        Ok(counts)
    }

    /// Full load sequence: connect, optionally clear, upload, verify.
    pub async fn run(&self, path: &Path, clear: bool) -> Result<Vec<ClassCount>> {
        self.verify_connection().await?;
        if clear {
            self.clear_dataset().await?;
        }
        self.upload_file(path).await?;
        self.verify_counts().await
    }
}
