use async_trait::async_trait;
use neo4rs::{Graph, Query};
use tracing::info;

use extract::ExtractionRecord;

use crate::store::{GraphStats, GraphStore, OffenseContext, OffenseEmbedding, StoreError};

/// Neo4j-backed graph store. All writes go through Cypher MERGE so re-runs
/// never duplicate nodes or edges; a record's nodes and edges are committed
/// in one transaction so readers never observe a half-written offense.
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, StoreError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(classify)?;
        Ok(Self { graph })
    }

    /// Unique constraint on offense identity plus lookup indexes. The
    /// constraint is what makes concurrent upserts of the same offense safe
    /// at the store level.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let statements = [
            "CREATE CONSTRAINT offense_name_unique IF NOT EXISTS FOR (o:Offense) REQUIRE o.name IS UNIQUE",
            "CREATE INDEX chapter_title_index IF NOT EXISTS FOR (c:Chapter) ON (c.title)",
            "CREATE INDEX section_key_index IF NOT EXISTS FOR (s:Section) ON (s.chapter, s.number)",
        ];

        for statement in statements {
            self.graph
                .run(Query::new(statement.to_string()))
                .await
                .map_err(classify)?;
        }

        info!("Neo4j schema initialized");
        Ok(())
    }

    async fn count(&self, cypher: &str) -> Result<usize, StoreError> {
        let mut result = self
            .graph
            .execute(Query::new(cypher.to_string()))
            .await
            .map_err(classify)?;

        if let Some(row) = result.next().await.map_err(classify)? {
            Ok(row.get::<i64>("count").unwrap_or(0) as usize)
        } else {
            Ok(0)
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn upsert_record(&self, record: &ExtractionRecord) -> Result<(), StoreError> {
        let key = record.offense_key();
        let (chunk, span) = match &record.provenance {
            Some(p) => (p.chunk_id.clone(), (p.span.0 as i64, p.span.1 as i64)),
            None => (String::new(), (0, 0)),
        };

        let mut queries = vec![Query::new(
            r#"
            MERGE (o:Offense {name: $key})
            SET o.display = $display,
                o.source_chunk = $chunk,
                o.span_start = $span_start,
                o.span_end = $span_end
            "#
            .to_string(),
        )
        .param("key", key.clone())
        .param("display", record.offense.trim().to_string())
        .param("chunk", chunk)
        .param("span_start", span.0)
        .param("span_end", span.1)];

        if record.has_chapter() {
            queries.push(
                Query::new(
                    r#"
                    MERGE (c:Chapter {title: $chapter})
                    WITH c
                    MATCH (o:Offense {name: $key})
                    MERGE (o)-[:belongsToChapter]->(c)
                    "#
                    .to_string(),
                )
                .param("chapter", record.chapter.trim().to_string())
                .param("key", key.clone()),
            );
        }

        if record.has_section() {
            queries.push(
                Query::new(
                    r#"
                    MERGE (s:Section {chapter: $chapter, number: $section})
                    WITH s
                    MATCH (o:Offense {name: $key})
                    MERGE (o)-[:refersToSection]->(s)
                    "#
                    .to_string(),
                )
                .param("chapter", record.chapter.trim().to_string())
                .param("section", record.section.trim().to_string())
                .param("key", key.clone()),
            );
        }

        if record.has_punishment() {
            queries.push(
                Query::new(
                    r#"
                    MERGE (p:Punishment {text: $punishment})
                    WITH p
                    MATCH (o:Offense {name: $key})
                    MERGE (o)-[:hasPunishment]->(p)
                    "#
                    .to_string(),
                )
                .param("punishment", record.punishment.trim().to_string())
                .param("key", key),
            );
        }

        let mut txn = self.graph.start_txn().await.map_err(classify)?;
        txn.run_queries(queries).await.map_err(classify)?;
        txn.commit().await.map_err(classify)?;

        Ok(())
    }

    async fn offenses_missing_embedding(
        &self,
        model_version: &str,
    ) -> Result<Vec<String>, StoreError> {
        let query = Query::new(
            r#"
            MATCH (o:Offense)
            WHERE o.embedding IS NULL OR o.embedding_model <> $version
            RETURN o.name AS name
            "#
            .to_string(),
        )
        .param("version", model_version.to_string());

        let mut result = self.graph.execute(query).await.map_err(classify)?;
        let mut names = Vec::new();

        while let Some(row) = result.next().await.map_err(classify)? {
            if let Ok(name) = row.get::<String>("name") {
                names.push(name);
            }
        }

        Ok(names)
    }

    async fn store_embedding(
        &self,
        offense: &str,
        model_version: &str,
        vector: &[f32],
    ) -> Result<(), StoreError> {
        let vector: Vec<f64> = vector.iter().map(|v| *v as f64).collect();

        let query = Query::new(
            r#"
            MATCH (o:Offense {name: $name})
            SET o.embedding = $vector,
                o.embedding_model = $version
            "#
            .to_string(),
        )
        .param("name", offense.to_string())
        .param("version", model_version.to_string())
        .param("vector", vector);

        self.graph.run(query).await.map_err(classify)
    }

    async fn offense_embeddings(
        &self,
        model_version: &str,
    ) -> Result<Vec<OffenseEmbedding>, StoreError> {
        let query = Query::new(
            r#"
            MATCH (o:Offense)
            WHERE o.embedding_model = $version AND o.embedding IS NOT NULL
            RETURN o.name AS name, o.embedding AS embedding
            "#
            .to_string(),
        )
        .param("version", model_version.to_string());

        let mut result = self.graph.execute(query).await.map_err(classify)?;
        let mut embeddings = Vec::new();

        while let Some(row) = result.next().await.map_err(classify)? {
            let name: String = match row.get("name") {
                Ok(name) => name,
                Err(_) => continue,
            };
            let vector: Vec<f64> = match row.get("embedding") {
                Ok(vector) => vector,
                Err(_) => continue,
            };
            embeddings.push(OffenseEmbedding {
                offense: name,
                vector: vector.into_iter().map(|v| v as f32).collect(),
            });
        }

        Ok(embeddings)
    }

    async fn offense_context(&self, offense: &str) -> Result<Option<OffenseContext>, StoreError> {
        let query = Query::new(
            r#"
            MATCH (o:Offense {name: $name})
            OPTIONAL MATCH (o)-[:belongsToChapter]->(c:Chapter)
            OPTIONAL MATCH (o)-[:refersToSection]->(s:Section)
            OPTIONAL MATCH (o)-[:hasPunishment]->(p:Punishment)
            RETURN o.display AS offense,
                   c.title AS chapter,
                   s.number AS section,
                   p.text AS punishment
            "#
            .to_string(),
        )
        .param("name", offense.to_string());

        let mut result = self.graph.execute(query).await.map_err(classify)?;

        let Some(row) = result.next().await.map_err(classify)? else {
            return Ok(None);
        };

        Ok(Some(OffenseContext {
            offense: row.get::<String>("offense").unwrap_or_else(|_| offense.to_string()),
            chapter: row.get::<String>("chapter").ok(),
            section: row.get::<String>("section").ok(),
            punishment: row.get::<String>("punishment").ok(),
        }))
    }

    async fn stats(&self) -> Result<GraphStats, StoreError> {
        Ok(GraphStats {
            offenses: self.count("MATCH (o:Offense) RETURN count(o) AS count").await?,
            chapters: self.count("MATCH (c:Chapter) RETURN count(c) AS count").await?,
            sections: self.count("MATCH (s:Section) RETURN count(s) AS count").await?,
            punishments: self
                .count("MATCH (p:Punishment) RETURN count(p) AS count")
                .await?,
            edges: self.count("MATCH ()-[r]->() RETURN count(r) AS count").await?,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .map_err(classify)
    }
}

/// neo4rs flattens transport and protocol failures into one error type;
/// connectivity-shaped messages are retryable, the rest are not.
fn classify(err: neo4rs::Error) -> StoreError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if lower.contains("connection") || lower.contains("io error") || lower.contains("timed out") {
        StoreError::Transient(message)
    } else {
        StoreError::Permanent(message)
    }
}
