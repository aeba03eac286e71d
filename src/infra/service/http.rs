use super::ComparisonService;
use super::wire::{
    CompareResponse, ErrorBody, ProgressResponse, TaskIdResponse, form_fields, rows_from_wire,
};
use crate::domain::{
    CompareError, CompareParams, ComparisonRow, DocumentFile, DocumentSide, JobId, TaskSnapshot,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const START_TASK_PATH: &str = "start-task/";
const COMPARE_PATH: &str = "compare/";

/// [`ComparisonService`] over HTTP with multipart submissions.
#[derive(Debug, Clone)]
pub struct HttpComparisonService {
    client: Client,
    base_url: String,
}

impl HttpComparisonService {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_form(params: &CompareParams) -> Result<Form, CompareError> {
        let mut form = Form::new();
        for (name, value) in form_fields(params) {
            form = form.text(name, value);
        }
        for (field, side) in [
            ("left_file", DocumentSide::Left),
            ("right_file", DocumentSide::Right),
        ] {
            let file = params
                .side(side)
                .file
                .as_ref()
                .ok_or(crate::domain::ValidationError::MissingFile(side))?;
            form = form.part(field, file_part(file));
        }
        Ok(form)
    }

    async fn submit<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &CompareParams,
    ) -> Result<T, CompareError> {
        let form = Self::build_form(params)?;
        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .map_err(|e| CompareError::Submission(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CompareError::Submission(error_detail(response).await));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| CompareError::Submission(format!("malformed response: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CompareError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| CompareError::Transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CompareError::Transport(error_detail(response).await));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| CompareError::Transport(format!("malformed response: {e}")))
    }
}

fn file_part(file: &DocumentFile) -> Part {
    Part::bytes(file.bytes.to_vec()).file_name(file.name.clone())
}

async fn error_detail(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => format!("HTTP {}: {}", status, body.message()),
        Err(_) => format!("HTTP {}", status),
    }
}

#[async_trait]
impl ComparisonService for HttpComparisonService {
    async fn start_task(&self, params: &CompareParams) -> Result<JobId, CompareError> {
        let response: TaskIdResponse = self.submit(START_TASK_PATH, params).await?;
        Ok(response.task_id)
    }

    async fn compare(&self, params: &CompareParams) -> Result<Vec<ComparisonRow>, CompareError> {
        let response: CompareResponse = self.submit(COMPARE_PATH, params).await?;
        rows_from_wire(response.comparison)
            .map_err(|e| CompareError::Submission(format!("malformed row: {e}")))
    }

    async fn progress(&self, job_id: &str) -> Result<TaskSnapshot, CompareError> {
        let response: ProgressResponse = self.get_json(&format!("progress/{job_id}")).await?;
        response
            .into_snapshot()
            .map_err(|e| CompareError::Transport(format!("malformed progress: {e}")))
    }

    async fn result(&self, job_id: &str) -> Result<Vec<ComparisonRow>, CompareError> {
        let response: CompareResponse = self.get_json(&format!("result/{job_id}")).await?;
        rows_from_wire(response.comparison)
            .map_err(|e| CompareError::Transport(format!("malformed row: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let service =
            HttpComparisonService::new("http://localhost:8000", Duration::from_secs(5)).unwrap();
        assert_eq!(service.url("progress/abc"), "http://localhost:8000/progress/abc");

        let service =
            HttpComparisonService::new("http://host/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(service.url(START_TASK_PATH), "http://host/api/start-task/");
    }
}
