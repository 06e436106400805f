use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;

use cb_core::{
    Article, ArticleStatus, ArticleStore, Error, JobRecord, JobStatus, JobStore,
    NewsletterArchive, NewsletterEntry, Result,
};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        link TEXT NOT NULL UNIQUE,
        guid TEXT UNIQUE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        content TEXT,
        pub_date TEXT NOT NULL,
        creator TEXT NOT NULL,
        categories TEXT NOT NULL,
        image_url TEXT,
        source_name TEXT NOT NULL,
        source_url TEXT NOT NULL,
        relevance_score REAL NOT NULL,
        student_priority INTEGER NOT NULL,
        ai_reasoning TEXT NOT NULL,
        ai_categories TEXT NOT NULL,
        ai_scored INTEGER NOT NULL,
        scoring_error INTEGER NOT NULL,
        fetch_date TEXT NOT NULL,
        daily_rank INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS newsletters (
        week_number INTEGER NOT NULL,
        year INTEGER NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        html_content TEXT NOT NULL,
        date_range TEXT NOT NULL,
        article_count INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (week_number, year)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        result TEXT,
        error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_articles_fetch_date ON articles (fetch_date)
    "#,
];

/// SQLite backend. The UNIQUE constraints on link/guid and the composite
/// newsletter primary key carry the race-safety guarantees, not the
/// application-level existence checks.
pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SqliteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("failed to open {}: {}", db_path.display(), e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("migration {} failed: {}", i, e)))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn row_to_article(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let categories: Vec<String> = serde_json::from_str(row.get::<String, _>("categories").as_str())?;
    let ai_categories: Vec<String> =
        serde_json::from_str(row.get::<String, _>("ai_categories").as_str())?;

    Ok(Article {
        link: row.get("link"),
        guid: row.get("guid"),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        pub_date: chrono::DateTime::parse_from_rfc3339(row.get::<String, _>("pub_date").as_str())
            .map_err(|e| Error::Storage(format!("bad pub_date: {}", e)))?
            .with_timezone(&chrono::Utc),
        creator: row.get("creator"),
        categories,
        image_url: row.get("image_url"),
        source_name: row.get("source_name"),
        source_url: row.get("source_url"),
        relevance_score: row.get("relevance_score"),
        student_priority: row.get("student_priority"),
        ai_reasoning: row.get("ai_reasoning"),
        ai_categories,
        ai_scored: row.get("ai_scored"),
        scoring_error: row.get("scoring_error"),
        fetch_date: NaiveDate::parse_from_str(row.get::<String, _>("fetch_date").as_str(), "%Y-%m-%d")
            .map_err(|e| Error::Storage(format!("bad fetch_date: {}", e)))?,
        daily_rank: row.get::<Option<i64>, _>("daily_rank").map(|r| r as u32),
    })
}

fn row_to_newsletter(row: &sqlx::sqlite::SqliteRow) -> Result<NewsletterEntry> {
    Ok(NewsletterEntry {
        week_number: row.get::<i64, _>("week_number") as u32,
        year: row.get::<i64, _>("year") as i32,
        title: row.get("title"),
        content: row.get("content"),
        html_content: row.get("html_content"),
        date_range: row.get("date_range"),
        article_count: row.get::<i64, _>("article_count") as u32,
        created_at: chrono::DateTime::parse_from_rfc3339(
            row.get::<String, _>("created_at").as_str(),
        )
        .map_err(|e| Error::Storage(format!("bad created_at: {}", e)))?
        .with_timezone(&chrono::Utc),
    })
}

#[async_trait]
impl ArticleStore for SqliteStorage {
    async fn find_article(&self, link: &str, guid: Option<&str>) -> Result<Option<Article>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE link = ?1 OR (?2 IS NOT NULL AND guid = ?2)
            LIMIT 1
            "#,
        )
        .bind(link)
        .bind(guid)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("find_article failed: {}", e)))?;

        row.as_ref().map(row_to_article).transpose()
    }

    async fn upsert_article(
        &self,
        article: &Article,
        force_refresh: bool,
    ) -> Result<ArticleStatus> {
        if let Some(_existing) = self
            .find_article(&article.link, article.guid.as_deref())
            .await?
        {
            if !force_refresh {
                return Ok(ArticleStatus::Unchanged);
            }
            sqlx::query(
                r#"
                UPDATE articles SET
                    title = ?, description = ?, content = ?, pub_date = ?,
                    creator = ?, categories = ?, image_url = ?,
                    relevance_score = ?, student_priority = ?, ai_reasoning = ?,
                    ai_categories = ?, ai_scored = ?, scoring_error = ?
                WHERE link = ? OR (? IS NOT NULL AND guid = ?)
                "#,
            )
            .bind(&article.title)
            .bind(&article.description)
            .bind(&article.content)
            .bind(article.pub_date.to_rfc3339())
            .bind(&article.creator)
            .bind(serde_json::to_string(&article.categories)?)
            .bind(&article.image_url)
            .bind(article.relevance_score)
            .bind(article.student_priority)
            .bind(&article.ai_reasoning)
            .bind(serde_json::to_string(&article.ai_categories)?)
            .bind(article.ai_scored)
            .bind(article.scoring_error)
            .bind(&article.link)
            .bind(article.guid.as_deref())
            .bind(article.guid.as_deref())
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("update failed: {}", e)))?;
            return Ok(ArticleStatus::Updated);
        }

        // INSERT OR IGNORE so a concurrent insert of the same link/guid
        // loses quietly instead of duplicating the row.
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO articles (
                link, guid, title, description, content, pub_date, creator,
                categories, image_url, source_name, source_url,
                relevance_score, student_priority, ai_reasoning, ai_categories,
                ai_scored, scoring_error, fetch_date, daily_rank
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.link)
        .bind(article.guid.as_deref())
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.content)
        .bind(article.pub_date.to_rfc3339())
        .bind(&article.creator)
        .bind(serde_json::to_string(&article.categories)?)
        .bind(&article.image_url)
        .bind(&article.source_name)
        .bind(&article.source_url)
        .bind(article.relevance_score)
        .bind(article.student_priority)
        .bind(&article.ai_reasoning)
        .bind(serde_json::to_string(&article.ai_categories)?)
        .bind(article.ai_scored)
        .bind(article.scoring_error)
        .bind(article.fetch_date.format("%Y-%m-%d").to_string())
        .bind(article.daily_rank.map(|r| r as i64))
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("insert failed: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(ArticleStatus::Unchanged)
        } else {
            Ok(ArticleStatus::New)
        }
    }

    async fn get_by_fetch_date(
        &self,
        date: NaiveDate,
        source: Option<&str>,
    ) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE fetch_date = ?1 AND (?2 IS NULL OR source_name = ?2)
            ORDER BY id ASC
            "#,
        )
        .bind(date.format("%Y-%m-%d").to_string())
        .bind(source)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("get_by_fetch_date failed: {}", e)))?;

        rows.iter().map(row_to_article).collect()
    }

    async fn assign_daily_ranks(
        &self,
        date: NaiveDate,
        source: Option<&str>,
        ranks: &[(String, u32)],
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Storage(format!("begin failed: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE articles SET daily_rank = NULL
            WHERE fetch_date = ?1 AND (?2 IS NULL OR source_name = ?2)
            "#,
        )
        .bind(date.format("%Y-%m-%d").to_string())
        .bind(source)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Storage(format!("rank clear failed: {}", e)))?;

        for (link, rank) in ranks {
            sqlx::query("UPDATE articles SET daily_rank = ? WHERE link = ?")
                .bind(*rank as i64)
                .bind(link)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Storage(format!("rank update failed: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Storage(format!("commit failed: {}", e)))
    }

    async fn get_ranked_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        max_rank: u32,
    ) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE fetch_date >= ? AND fetch_date <= ?
              AND daily_rank IS NOT NULL AND daily_rank <= ?
            ORDER BY id ASC
            "#,
        )
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(end.format("%Y-%m-%d").to_string())
        .bind(max_rank as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("get_ranked_between failed: {}", e)))?;

        rows.iter().map(row_to_article).collect()
    }
}

#[async_trait]
impl NewsletterArchive for SqliteStorage {
    async fn find_newsletter(&self, week: u32, year: i32) -> Result<Option<NewsletterEntry>> {
        let row = sqlx::query("SELECT * FROM newsletters WHERE week_number = ? AND year = ?")
            .bind(week as i64)
            .bind(year as i64)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("find_newsletter failed: {}", e)))?;

        row.as_ref().map(row_to_newsletter).transpose()
    }

    async fn save_newsletter(&self, entry: &NewsletterEntry) -> Result<NewsletterEntry> {
        sqlx::query(
            r#"
            INSERT INTO newsletters (
                week_number, year, title, content, html_content,
                date_range, article_count, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.week_number as i64)
        .bind(entry.year as i64)
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(&entry.html_content)
        .bind(&entry.date_range)
        .bind(entry.article_count as i64)
        .bind(entry.created_at.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::DuplicateWeek {
                week: entry.week_number,
                year: entry.year,
            },
            _ => Error::Storage(format!("save_newsletter failed: {}", e)),
        })?;

        Ok(entry.clone())
    }
}

#[async_trait]
impl JobStore for SqliteStorage {
    async fn put_job(&self, job: &JobRecord) -> Result<()> {
        let status = match job.status {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO jobs (id, status, result, error, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(status)
        .bind(job.result.as_ref().map(|r| r.to_string()))
        .bind(&job.error)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("put_job failed: {}", e)))?;
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("get_job failed: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status = match row.get::<String, _>("status").as_str() {
            "pending" => JobStatus::Pending,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        };
        let result = row
            .get::<Option<String>, _>("result")
            .map(|r| serde_json::from_str(&r))
            .transpose()?;

        Ok(Some(JobRecord {
            id: row.get("id"),
            status,
            result,
            error: row.get("error"),
            created_at: chrono::DateTime::parse_from_rfc3339(
                row.get::<String, _>("created_at").as_str(),
            )
            .map_err(|e| Error::Storage(format!("bad created_at: {}", e)))?
            .with_timezone(&chrono::Utc),
            updated_at: chrono::DateTime::parse_from_rfc3339(
                row.get::<String, _>("updated_at").as_str(),
            )
            .map_err(|e| Error::Storage(format!("bad updated_at: {}", e)))?
            .with_timezone(&chrono::Utc),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn article(link: &str, date: NaiveDate, score: f64) -> Article {
        Article {
            link: link.to_string(),
            guid: Some(format!("guid-{}", link)),
            title: format!("Article {}", link),
            description: "desc".to_string(),
            content: None,
            pub_date: Utc::now(),
            creator: "author".to_string(),
            categories: vec!["education".to_string()],
            image_url: None,
            source_name: "test".to_string(),
            source_url: "http://example.com".to_string(),
            relevance_score: score,
            student_priority: score >= 7.0,
            ai_reasoning: String::new(),
            ai_categories: vec![],
            ai_scored: false,
            scoring_error: false,
            fetch_date: date,
            daily_rank: None,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[tokio::test]
    async fn upsert_and_requery_round_trips() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new_with_path(&dir.path().join("test.db"))
            .await
            .unwrap();

        let a = article("http://a/1", day(), 7.5);
        assert_eq!(
            storage.upsert_article(&a, false).await.unwrap(),
            ArticleStatus::New
        );
        assert_eq!(
            storage.upsert_article(&a, false).await.unwrap(),
            ArticleStatus::Unchanged
        );

        let stored = storage.get_by_fetch_date(day(), None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].link, "http://a/1");
        assert_eq!(stored[0].relevance_score, 7.5);
        assert!(stored[0].student_priority);
        assert_eq!(stored[0].categories, vec!["education"]);
        assert_eq!(stored[0].fetch_date, day());
    }

    #[tokio::test]
    async fn insertion_order_is_preserved() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new_with_path(&dir.path().join("test.db"))
            .await
            .unwrap();

        for i in 0..5 {
            let a = article(&format!("http://a/{}", i), day(), 5.0);
            storage.upsert_article(&a, false).await.unwrap();
        }
        let stored = storage.get_by_fetch_date(day(), None).await.unwrap();
        let links: Vec<_> = stored.iter().map(|a| a.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["http://a/0", "http://a/1", "http://a/2", "http://a/3", "http://a/4"]
        );
    }

    #[tokio::test]
    async fn ranks_are_persisted_and_filtered() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new_with_path(&dir.path().join("test.db"))
            .await
            .unwrap();

        for i in 0..3 {
            let a = article(&format!("http://a/{}", i), day(), i as f64);
            storage.upsert_article(&a, false).await.unwrap();
        }
        storage
            .assign_daily_ranks(
                day(),
                None,
                &[
                    ("http://a/2".to_string(), 1),
                    ("http://a/1".to_string(), 2),
                    ("http://a/0".to_string(), 11),
                ],
            )
            .await
            .unwrap();

        let ranked = storage.get_ranked_between(day(), day(), 10).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|a| a.daily_rank.unwrap() <= 10));
    }

    #[tokio::test]
    async fn duplicate_newsletter_maps_to_duplicate_week() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new_with_path(&dir.path().join("test.db"))
            .await
            .unwrap();

        let entry = NewsletterEntry {
            week_number: 10,
            year: 2024,
            title: "Week 10".to_string(),
            content: "# Newsletter".to_string(),
            html_content: "<h1>Newsletter</h1>".to_string(),
            date_range: "Mar 4 - Mar 10, 2024".to_string(),
            article_count: 6,
            created_at: Utc::now(),
        };
        storage.save_newsletter(&entry).await.unwrap();
        let err = storage.save_newsletter(&entry).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateWeek { .. }));

        let found = storage.find_newsletter(10, 2024).await.unwrap().unwrap();
        assert_eq!(found.article_count, 6);
    }

    #[tokio::test]
    async fn job_status_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let storage = SqliteStorage::new_with_path(&path).await.unwrap();
            let job = JobRecord::pending("job-1".to_string(), Utc::now())
                .complete(serde_json::json!({"stage": "daily"}), Utc::now());
            storage.put_job(&job).await.unwrap();
        }

        let storage = SqliteStorage::new_with_path(&path).await.unwrap();
        let job = storage.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.unwrap()["stage"], "daily");
    }
}
