//! Mock SaaS endpoints for the HTTP collaborators
//!
//! One wiremock server stands in for Brevo, Cloudinary and the TSE page.

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const CLOUD_NAME: &str = "demo-cloud";
pub const TSE_PATH: &str = "/chc/consulta_cedula.aspx";

pub const TSE_FORM_PAGE: &str = r#"<html><body><form method="post" action="consulta_cedula.aspx">
    <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="dDwtMTA4" />
    <input type="hidden" name="__VIEWSTATEGENERATOR" value="1A2B3C" />
    <input type="hidden" name="__EVENTVALIDATION" value="ev123" />
    <input name="txtcedula" type="text" id="txtcedula" />
    <input type="submit" name="btnConsultaCedula" value="Consultar" />
    </form></body></html>"#;

pub const TSE_RESULT_PAGE: &str = r#"<html><body><table>
    <tr><td>Nombre Completo:</td><td>JUAN CARLOS ROJAS QUESADA</td></tr>
    <tr><td>Fecha Nacimiento:</td><td>21/07/1985</td></tr>
    <tr><td>Nacionalidad:</td><td>COSTARRICENSE</td></tr>
    </table></body></html>"#;

pub struct SaasMockServer {
    pub server: MockServer,
}

impl SaasMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn tse_url(&self) -> String {
        format!("{}{}", self.server.uri(), TSE_PATH)
    }

    /// `POST /smtp/email` answering with `status`
    pub async fn mock_brevo(&self, api_key: &str, status: u16) {
        let body = if status < 300 {
            json!({"messageId": "<202610181200.1234@smtp-relay.mailin.fr>"})
        } else {
            json!({"code": "unauthorized", "message": "Key not found"})
        };

        Mock::given(method("POST"))
            .and(path("/smtp/email"))
            .and(header("api-key", api_key))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Unsigned upload endpoint answering with `status` and `body`
    pub async fn mock_cloudinary(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path(format!("/{}/image/upload", CLOUD_NAME)))
            .and(body_string_contains("upload_preset=eventos_preset"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Form page on GET, result page on POST
    pub async fn mock_tse(&self, result_page: &str) {
        Mock::given(method("GET"))
            .and(path(TSE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "ASP.NET_SessionId=abc123; path=/")
                    .set_body_string(TSE_FORM_PAGE),
            )
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path(TSE_PATH))
            .and(body_string_contains("__VIEWSTATE=dDwtMTA4"))
            .respond_with(ResponseTemplate::new(200).set_body_string(result_page.to_string()))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_tse_down(&self) {
        Mock::given(path(TSE_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.server)
            .await;
    }

    pub async fn request_count(&self) -> usize {
        self.server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }
}
