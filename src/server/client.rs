// src/server/client.rs

//! Browser side of live reload.

pub const CLIENT_PATH: &str = "/__assetflow/client.js";
pub const RELOAD_PATH: &str = "/__assetflow/reload";

/// Connects to the reload socket. `page` refreshes the document, `css`
/// re-fetches same-origin stylesheets in place.
pub const CLIENT_JS: &str = r#"(function () {
  var url = (location.protocol === "https:" ? "wss://" : "ws://") + location.host + "/__assetflow/reload";

  function reloadCss() {
    var links = document.querySelectorAll('link[rel~="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var link = links[i];
      var href = link.getAttribute("href");
      if (!href || /^(https?:)?\/\//.test(href)) continue;
      link.href = href.replace(/[?&]assetflow=\d+/, "") + (href.indexOf("?") < 0 ? "?" : "&") + "assetflow=" + Date.now();
    }
  }

  function connect() {
    var ws = new WebSocket(url);
    ws.onmessage = function (ev) {
      if (ev.data === "css") {
        reloadCss();
      } else {
        location.reload();
      }
    };
    ws.onclose = function () {
      setTimeout(connect, 1000);
    };
  }

  connect();
})();
"#;

/// Add the client `<script>` before the last `</body>`, or at the end when
/// the document has none.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
    // ASCII lowercasing keeps byte offsets.
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..at]);
            out.push_str(&tag);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_before_closing_body() {
        let out = inject_script("<html><BODY><p>x</p></Body></html>");
        assert_eq!(
            out,
            r#"<html><BODY><p>x</p><script src="/__assetflow/client.js"></script></Body></html>"#
        );
    }

    #[test]
    fn appends_without_body() {
        let out = inject_script("<p>fragment</p>");
        assert!(out.starts_with("<p>fragment</p><script"));
    }
}
