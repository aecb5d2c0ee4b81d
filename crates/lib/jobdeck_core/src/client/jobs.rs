//! Job store operations.
//!
//! Listing is public and cached; the mutations require a bearer token and
//! invalidate the `jobs` tag once the server confirms the write.

use tracing::debug;

use crate::cache::{KEY_JOB_LIST, TAG_JOBS};
use crate::models::{Job, JobCreate, JobUpdate};

use super::{ApiClient, ApiError, error_from_response, read_json, transport};

impl ApiClient {
    /// List all jobs. Served from cache until a job mutation invalidates it.
    pub async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        if let Some(jobs) = self.cache.read().await.get::<Vec<Job>>(KEY_JOB_LIST) {
            debug!("job list served from cache");
            return Ok(jobs);
        }
        let url = self.endpoint("jobs/")?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(transport("listing jobs"))?;
        let jobs: Vec<Job> = read_json("listing jobs", resp).await?;
        self.cache
            .write()
            .await
            .put(KEY_JOB_LIST, &jobs, &[TAG_JOBS], None);
        Ok(jobs)
    }

    /// Fetch a single job. A missing id maps to [`ApiError::NotFound`].
    pub async fn get_job(&self, id: i64) -> Result<Job, ApiError> {
        let url = self.endpoint(&format!("jobs/{id}"))?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(transport("fetching job"))?;
        read_json("fetching job", resp).await
    }

    /// Create a job posting. Invalidates the job-list cache on success.
    pub async fn create_job(&self, payload: &JobCreate) -> Result<Job, ApiError> {
        let token = self.bearer().await?;
        let url = self.endpoint("jobs/create_protected")?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(transport("creating job"))?;
        let job: Job = read_json("creating job", resp).await?;
        self.cache.write().await.invalidate_tag(TAG_JOBS);
        debug!(job_id = job.id, "job created");
        Ok(job)
    }

    /// Update a job posting (PUT; the server replaces supplied fields).
    /// Invalidates the job-list cache on success.
    pub async fn update_job(&self, id: i64, payload: &JobUpdate) -> Result<Job, ApiError> {
        let token = self.bearer().await?;
        let url = self.endpoint(&format!("jobs/{id}"))?;
        let resp = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(transport("updating job"))?;
        let job: Job = read_json("updating job", resp).await?;
        self.cache.write().await.invalidate_tag(TAG_JOBS);
        debug!(job_id = job.id, "job updated");
        Ok(job)
    }

    /// Delete a job posting. Invalidates the job-list cache on success.
    pub async fn delete_job(&self, id: i64) -> Result<(), ApiError> {
        let token = self.bearer().await?;
        let url = self.endpoint(&format!("jobs/{id}"))?;
        let resp = self
            .http
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport("deleting job"))?;
        if !resp.status().is_success() {
            return Err(error_from_response("deleting job", resp).await);
        }
        self.cache.write().await.invalidate_tag(TAG_JOBS);
        debug!(job_id = id, "job deleted");
        Ok(())
    }
}
