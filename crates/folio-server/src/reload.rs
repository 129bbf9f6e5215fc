//! Live reload over a websocket.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Websocket endpoint browsers connect to.
pub const RELOAD_PATH: &str = "/__reload";

/// Path of the client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__reload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Re-fetch one stylesheet
    Css {
        /// URL path of the stylesheet
        path: String,
    },
}

/// Hub for broadcasting reload messages to all connected browsers.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to every connected browser.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert the client script tag before `</body>`, or at the end.
pub fn inject_reload_script(html: &str) -> String {
    let tag = format!(r#"<script src="{RELOAD_SCRIPT_PATH}"></script>"#);
    match html.rfind("</body>") {
        Some(at) => format!("{}{}\n{}", &html[..at], tag, &html[at..]),
        None => format!("{html}\n{tag}\n"),
    }
}

/// Generate the client-side reload script.
pub fn reload_client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const protocol = location.protocol === 'https:' ? 'wss:' : 'ws:';
  const ws = new WebSocket(protocol + '//' + location.host + '{}');

  function refreshStylesheet(path) {{
    const links = document.querySelectorAll('link[rel="stylesheet"]');
    let found = false;
    links.forEach(function(link) {{
      const url = new URL(link.href, location.href);
      if (url.pathname === path) {{
        url.searchParams.set('v', Date.now());
        link.href = url.toString();
        found = true;
      }}
    }});
    return found;
  }}

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'css':
        if (!refreshStylesheet(msg.path)) {{
          location.reload();
        }}
        break;

      case 'connected':
        console.log('[folio] Live reload connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[folio] Live reload disconnected, retrying');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#,
        RELOAD_PATH
    )
}
