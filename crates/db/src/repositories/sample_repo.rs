//! Repositories for the `speed_samples` and `button_samples` tables.

use dashlabel_core::timeseries::{ButtonSampleInput, SpeedSampleInput};
use dashlabel_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::sample::{ButtonSample, SpeedSample};

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Serialize with offset changes, which hold the same row lock while they
/// rewrite a series.
async fn lock_video_row(conn: &mut PgConnection, video_id: DbId) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM videos WHERE id = $1 FOR UPDATE")
        .bind(video_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Offset carried by a video's series in `table`, or 0 for an empty series.
async fn current_offset(
    conn: &mut PgConnection,
    table: &'static str,
    video_id: DbId,
) -> Result<f64, sqlx::Error> {
    let query = format!(
        "SELECT COALESCE( \
            (SELECT timestamp_offset FROM {table} WHERE video_id = $1 LIMIT 1), 0)::float8"
    );
    sqlx::query_scalar(&query)
        .bind(video_id)
        .fetch_one(conn)
        .await
}

// ---------------------------------------------------------------------------
// SpeedSampleRepo
// ---------------------------------------------------------------------------

const SPEED_COLUMNS: &str = "id, video_id, timestamp, speed, latitude, longitude, \
                              altitude, accuracy, timestamp_offset, created_at";

/// GPS/speed readings.
pub struct SpeedSampleRepo;

impl SpeedSampleRepo {
    /// Append an uploaded series. Either every sample is stored or none is.
    ///
    /// New samples take the offset the series already carries, so an import
    /// after a shift lands on the same timeline as the existing samples.
    pub async fn insert_batch(
        pool: &PgPool,
        video_id: DbId,
        samples: &[SpeedSampleInput],
    ) -> Result<u64, sqlx::Error> {
        let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
        let speeds: Vec<f64> = samples.iter().map(|s| s.speed).collect();
        let latitudes: Vec<f64> = samples.iter().map(|s| s.latitude).collect();
        let longitudes: Vec<f64> = samples.iter().map(|s| s.longitude).collect();
        let altitudes: Vec<f64> = samples.iter().map(|s| s.altitude).collect();
        let accuracies: Vec<f64> = samples.iter().map(|s| s.accuracy).collect();

        let mut tx = pool.begin().await?;
        lock_video_row(&mut tx, video_id).await?;
        let offset = current_offset(&mut tx, "speed_samples", video_id).await?;

        let result = sqlx::query(
            "INSERT INTO speed_samples \
                (video_id, timestamp, speed, latitude, longitude, altitude, accuracy, timestamp_offset) \
             SELECT $1, t.*, $8 FROM UNNEST( \
                $2::float8[], $3::float8[], $4::float8[], $5::float8[], $6::float8[], $7::float8[]) AS t",
        )
        .bind(video_id)
        .bind(&timestamps)
        .bind(&speeds)
        .bind(&latitudes)
        .bind(&longitudes)
        .bind(&altitudes)
        .bind(&accuracies)
        .bind(offset)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// All samples of a video in ascending raw timestamp order.
    pub async fn list_by_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<SpeedSample>, sqlx::Error> {
        let query = format!(
            "SELECT {SPEED_COLUMNS} FROM speed_samples
             WHERE video_id = $1
             ORDER BY timestamp ASC, id ASC"
        );
        sqlx::query_as::<_, SpeedSample>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the offset of every sample of a video.
    pub async fn set_offset(
        conn: &mut PgConnection,
        video_id: DbId,
        offset: f64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE speed_samples SET timestamp_offset = $2 WHERE video_id = $1")
            .bind(video_id)
            .bind(offset)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// ButtonSampleRepo
// ---------------------------------------------------------------------------

const BUTTON_COLUMNS: &str = "id, video_id, timestamp, state, timestamp_offset, created_at";

/// Button press events.
pub struct ButtonSampleRepo;

impl ButtonSampleRepo {
    /// Same contract as [`SpeedSampleRepo::insert_batch`].
    pub async fn insert_batch(
        pool: &PgPool,
        video_id: DbId,
        samples: &[ButtonSampleInput],
    ) -> Result<u64, sqlx::Error> {
        let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
        let states: Vec<bool> = samples.iter().map(|s| s.state).collect();

        let mut tx = pool.begin().await?;
        lock_video_row(&mut tx, video_id).await?;
        let offset = current_offset(&mut tx, "button_samples", video_id).await?;

        let result = sqlx::query(
            "INSERT INTO button_samples (video_id, timestamp, state, timestamp_offset) \
             SELECT $1, t.*, $4 FROM UNNEST($2::float8[], $3::bool[]) AS t",
        )
        .bind(video_id)
        .bind(&timestamps)
        .bind(&states)
        .bind(offset)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    pub async fn list_by_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<ButtonSample>, sqlx::Error> {
        let query = format!(
            "SELECT {BUTTON_COLUMNS} FROM button_samples
             WHERE video_id = $1
             ORDER BY timestamp ASC, id ASC"
        );
        sqlx::query_as::<_, ButtonSample>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }

    pub async fn set_offset(
        conn: &mut PgConnection,
        video_id: DbId,
        offset: f64,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE button_samples SET timestamp_offset = $2 WHERE video_id = $1")
                .bind(video_id)
                .bind(offset)
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }
}
