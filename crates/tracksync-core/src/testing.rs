//! Test doubles for the remote ports and webhook payload builders.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use crate::domain::{
    IssueNumber, Iteration, NewStory, RemoteError, Service, Story, StoryId, StoryState,
    StoryUpdate,
};
use crate::ports::{IssueDetails, IssueSourceClient, TrackerClient};

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
}

/// Builder for the `issue` object of a GitHub `issues` event.
pub(crate) struct IssuePayload {
    id: u64,
    number: u64,
    title: String,
    labels: Vec<String>,
    state: &'static str,
    body: Option<String>,
    milestone: Option<(u64, String)>,
}

impl IssuePayload {
    pub(crate) fn new(id: u64, number: u64) -> Self {
        Self {
            id,
            number,
            title: format!("Issue {number}"),
            labels: vec![],
            state: "open",
            body: None,
            milestone: None,
        }
    }

    pub(crate) fn title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    pub(crate) fn labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| (*l).to_owned()).collect();
        self
    }

    pub(crate) fn closed(mut self) -> Self {
        self.state = "closed";
        self
    }

    pub(crate) fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_owned());
        self
    }

    pub(crate) fn milestone(mut self, id: u64, title: &str) -> Self {
        self.milestone = Some((id, title.to_owned()));
        self
    }

    pub(crate) fn build(&self) -> Value {
        let labels: Vec<Value> = self
            .labels
            .iter()
            .map(|name| json!({ "name": name }))
            .collect();
        let milestone = self
            .milestone
            .as_ref()
            .map(|(id, title)| json!({ "id": id, "title": title }));
        json!({
            "id": self.id,
            "number": self.number,
            "title": self.title,
            "html_url": format!("https://github.com/acme/widgets/issues/{}", self.number),
            "labels": labels,
            "state": self.state,
            "body": self.body,
            "milestone": milestone,
        })
    }
}

pub(crate) fn sender(login: &str) -> Value {
    json!({ "login": login })
}

pub(crate) fn story(id: u64, state: StoryState) -> Story {
    Story {
        id: StoryId::new(id),
        name: format!("story {id}"),
        description: None,
        story_type: crate::domain::StoryType::Chore,
        current_state: state,
        estimate: None,
        accepted_at: None,
        labels: vec![],
        url: format!("https://www.pivotaltracker.com/story/show/{id}"),
    }
}

/// Tracker double keeping stories in memory and recording every call.
pub(crate) struct FakeTracker {
    next_id: AtomicU64,
    stories: Mutex<HashMap<StoryId, Story>>,
    iterations: Mutex<Vec<Iteration>>,
    created: Mutex<Vec<NewStory>>,
    updates: Mutex<Vec<(StoryId, StoryUpdate)>>,
    fetches: AtomicU64,
    fail_updates: AtomicBool,
}

impl FakeTracker {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            stories: Mutex::new(HashMap::new()),
            iterations: Mutex::new(vec![]),
            created: Mutex::new(vec![]),
            updates: Mutex::new(vec![]),
            fetches: AtomicU64::new(0),
            fail_updates: AtomicBool::new(false),
        }
    }

    pub(crate) fn insert(&self, story: Story) {
        self.stories.lock().unwrap().insert(story.id, story);
    }

    pub(crate) fn remove(&self, id: StoryId) {
        self.stories.lock().unwrap().remove(&id);
    }

    pub(crate) fn story(&self, id: StoryId) -> Option<Story> {
        self.stories.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn set_iterations(&self, iterations: Vec<Iteration>) {
        *self.iterations.lock().unwrap() = iterations;
    }

    pub(crate) fn created(&self) -> Vec<NewStory> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn updates(&self) -> Vec<(StoryId, StoryUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub(crate) fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TrackerClient for FakeTracker {
    async fn create_story(&self, new: NewStory) -> Result<Story, RemoteError> {
        let id = StoryId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut created = story(id.get(), StoryState::Unscheduled);
        created.name = new.name.clone();
        created.description = Some(new.description.clone());
        created.story_type = new.story_type;
        self.created.lock().unwrap().push(new);
        self.insert(created.clone());
        Ok(created)
    }

    async fn fetch_story(&self, id: StoryId) -> Result<Option<Story>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.story(id))
    }

    async fn update_story(&self, id: StoryId, update: &StoryUpdate) -> Result<Story, RemoteError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RemoteError::with_status(Service::Tracker, 500, "boom"));
        }
        self.updates.lock().unwrap().push((id, update.clone()));
        let mut stories = self.stories.lock().unwrap();
        let story = stories
            .get_mut(&id)
            .ok_or_else(|| RemoteError::with_status(Service::Tracker, 404, "not found"))?;
        story.apply(update);
        Ok(story.clone())
    }

    async fn current_iterations(&self) -> Result<Vec<Iteration>, RemoteError> {
        Ok(self.iterations.lock().unwrap().clone())
    }
}

/// Issue source double. Comments and body updates are recorded per issue.
pub(crate) struct FakeIssueSource {
    issues: Mutex<HashMap<IssueNumber, IssueDetails>>,
    comments: Mutex<Vec<(IssueNumber, String)>>,
    body_updates: Mutex<Vec<(IssueNumber, String)>>,
    failing_comments: Mutex<HashSet<IssueNumber>>,
}

impl FakeIssueSource {
    pub(crate) fn new() -> Self {
        Self {
            issues: Mutex::new(HashMap::new()),
            comments: Mutex::new(vec![]),
            body_updates: Mutex::new(vec![]),
            failing_comments: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn insert(&self, number: u64, title: &str, body: &str) {
        self.issues.lock().unwrap().insert(
            IssueNumber::new(number),
            IssueDetails {
                title: title.to_owned(),
                body: body.to_owned(),
            },
        );
    }

    pub(crate) fn issue(&self, number: u64) -> Option<IssueDetails> {
        self.issues
            .lock()
            .unwrap()
            .get(&IssueNumber::new(number))
            .cloned()
    }

    pub(crate) fn comments(&self) -> Vec<(IssueNumber, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub(crate) fn body_updates(&self) -> Vec<(IssueNumber, String)> {
        self.body_updates.lock().unwrap().clone()
    }

    pub(crate) fn fail_comments_on(&self, number: u64, fail: bool) {
        let mut failing = self.failing_comments.lock().unwrap();
        if fail {
            failing.insert(IssueNumber::new(number));
        } else {
            failing.remove(&IssueNumber::new(number));
        }
    }
}

#[async_trait]
impl IssueSourceClient for FakeIssueSource {
    async fn fetch_issue(&self, number: IssueNumber) -> Result<IssueDetails, RemoteError> {
        self.issues
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| RemoteError::with_status(Service::IssueSource, 404, "Not Found"))
    }

    async fn update_issue(
        &self,
        number: IssueNumber,
        title: &str,
        body: &str,
    ) -> Result<(), RemoteError> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .get_mut(&number)
            .ok_or_else(|| RemoteError::with_status(Service::IssueSource, 404, "Not Found"))?;
        issue.title = title.to_owned();
        issue.body = body.to_owned();
        self.body_updates
            .lock()
            .unwrap()
            .push((number, body.to_owned()));
        Ok(())
    }

    async fn add_comment(&self, number: IssueNumber, text: &str) -> Result<(), RemoteError> {
        if self.failing_comments.lock().unwrap().contains(&number) {
            return Err(RemoteError::with_status(
                Service::IssueSource,
                502,
                "Bad Gateway",
            ));
        }
        self.comments
            .lock()
            .unwrap()
            .push((number, text.to_owned()));
        Ok(())
    }
}
