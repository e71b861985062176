//! Page-backed action execution
//!
//! Maps recorded actions onto a live page driver. Selector tokens go
//! through the reference cache, so recordings made against a snapshot
//! replay correctly after a reconnect once the snapshot refs are
//! restored.

use crate::driver::traits::{
    ActionOptions, EvaluateOptions, Locator, PageDriver, ScreenshotOptions,
};
use crate::page::PageState;
use crate::recording::replay::ActionExecutor;
use crate::recording::types::{ActionKind, RecordedAction};
use crate::refs::RefCache;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TYPE_KEY_DELAY: Duration = Duration::from_millis(20);

/// Executes recorded actions against one page
pub struct PageExecutor {
    page: Arc<dyn PageDriver>,
    refs: Arc<RefCache>,
    state: Arc<Mutex<PageState>>,
    options: ActionOptions,
}

impl PageExecutor {
    pub fn new(
        page: Arc<dyn PageDriver>,
        refs: Arc<RefCache>,
        state: Arc<Mutex<PageState>>,
    ) -> Self {
        Self {
            page,
            refs,
            state,
            options: ActionOptions::default(),
        }
    }

    fn locator_for(&self, action: &RecordedAction) -> Result<Locator> {
        let selector = action.selector.as_deref().ok_or_else(|| {
            Error::invalid_argument(format!(
                "Recorded {} action has no selector",
                action.kind.as_str()
            ))
        })?;
        self.refs.resolve(&self.state, selector)
    }

    fn value_for<'a>(&self, action: &'a RecordedAction) -> Result<&'a str> {
        action.value.as_deref().ok_or_else(|| {
            Error::invalid_argument(format!(
                "Recorded {} action has no value",
                action.kind.as_str()
            ))
        })
    }
}

#[async_trait]
impl ActionExecutor for PageExecutor {
    async fn execute(&self, action: &RecordedAction) -> Result<()> {
        match action.kind {
            ActionKind::Click => {
                let locator = self.locator_for(action)?;
                self.page.click(&locator, &self.options).await
            }
            ActionKind::Type => {
                let locator = self.locator_for(action)?;
                let text = self.value_for(action)?;
                self.page
                    .type_text(&locator, text, TYPE_KEY_DELAY, &self.options)
                    .await
            }
            ActionKind::Select => {
                let locator = self.locator_for(action)?;
                let value = self.value_for(action)?;
                self.page.fill(&locator, value, &self.options).await
            }
            ActionKind::Navigate => {
                let url = self.value_for(action)?;
                self.page.navigate(url).await
            }
            ActionKind::Keypress => {
                let key = self.value_for(action)?;
                let locator = match action.selector.as_deref() {
                    Some(selector) => self.refs.resolve(&self.state, selector)?,
                    None => Locator::Css("body".to_string()),
                };
                self.page.press_key(&locator, key, &self.options).await
            }
            ActionKind::Scroll => {
                let expression = match action.coordinates {
                    Some(point) => {
                        format!("window.scrollTo({}, {})", point.x, point.y)
                    }
                    None => {
                        let by: i64 = action
                            .value
                            .as_deref()
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(600);
                        format!("window.scrollBy(0, {})", by)
                    }
                };
                let outcome = self
                    .page
                    .evaluate(EvaluateOptions::expression(expression))
                    .await?;
                match outcome.exception {
                    Some(e) => Err(Error::action_failed(format!("Scroll failed: {}", e))),
                    None => Ok(()),
                }
            }
            ActionKind::Screenshot => {
                self.page.screenshot(ScreenshotOptions::default()).await?;
                Ok(())
            }
            // Pacing is reproduced from action offsets; an explicit wait
            // carries no extra work at execution time
            ActionKind::Wait => Ok(()),
        }
    }
}
