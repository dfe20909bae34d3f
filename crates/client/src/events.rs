//! Event stream cursor.

use crate::client::Client;
use crate::endpoints;
use crate::error::Error;
use crate::request::RequestSpec;
use crate::types::EventCursor;

impl Client {
    /// Current position in the domain's event stream, used as the
    /// starting point for polling changes.
    pub async fn event_cursor(&self) -> Result<EventCursor, Error> {
        let spec = RequestSpec::get(endpoints::EVENTS_CURSOR).root(self.root());
        self.execute(spec).await
    }
}
