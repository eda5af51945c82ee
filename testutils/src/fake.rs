use httpmock::prelude::*;
use httpmock::{
    Mock,
    Then,
    When,
};
use serde_json::json;

pub struct MockServerBuilder {
    server: MockServer,
    handlers: Vec<Box<dyn Fn(When, Then)>>,
    mock_ids: Vec<usize>,
}

fn print_req(req: &HttpMockRequest) -> bool {
    // Use println instead of info! so that this works outside of the lib crate
    println!("    Received: {} {}", req.method(), req.uri().path());
    true
}

impl MockServerBuilder {
    pub fn new() -> MockServerBuilder {
        MockServerBuilder {
            server: MockServer::start(),
            handlers: vec![],
            mock_ids: vec![],
        }
    }

    pub fn assert(&self) {
        for id in &self.mock_ids {
            println!("checking assertions for mock {id}");
            Mock::new(*id, &self.server).assert()
        }
    }

    pub fn handle<F: Fn(When, Then) + 'static>(&mut self, f: F) -> &mut Self {
        self.handlers.push(Box::new(move |w, t| {
            let w = w.matches(print_req);
            f(w, t);
        }));
        self
    }

    // Answer every request on `path` with a Status object; the HTTP code is taken from the body.
    pub fn handle_status(&mut self, path: String, status: serde_json::Value) -> &mut Self {
        let code = status["code"].as_u64().and_then(|c| u16::try_from(c).ok()).unwrap_or(500);
        self.handle(move |when, then| {
            when.path(&path);
            then.status(code).json_body(status.clone());
        })
    }

    pub fn handle_not_found(&mut self, path: String) -> &mut Self {
        self.handle_status(path, status_not_found())
    }

    // Serve a finite watch response: each line is one event, and the stream closes after the
    // last one the same way it would when the server-side timeout expires.
    pub fn handle_watch(&mut self, path: String, lines: Vec<String>) -> &mut Self {
        let body = lines.join("\n") + "\n";
        self.handle(move |when, then| {
            when.path(&path).method(GET).query_param("watch", "true");
            then.status(200).header("content-type", "application/json").body(&body);
        })
    }

    pub fn build(&mut self) {
        for f in self.handlers.iter() {
            self.mock_ids.push(self.server.mock(f).id);
        }

        // Print all unmatched/unhandled requests for easier debugging;
        // this has to go last so that the other mock rules have a chance
        // to match first
        self.server.mock(|when, _| {
            when.matches(print_req);
        });
    }

    pub fn url(&self) -> http::Uri {
        http::Uri::try_from(self.server.url("/")).unwrap()
    }
}

pub fn make_fake_apiserver() -> (MockServerBuilder, kube::Client) {
    let builder = MockServerBuilder::new();
    let config = kube::Config::new(builder.url());
    let client = kube::Client::try_from(config).unwrap();
    (builder, client)
}

pub fn status_not_found() -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "message": "the server could not find the requested resource",
      "reason": "NotFound",
      "code": 404
    })
}

pub fn status_forbidden() -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "message": "deployments.apps is forbidden: User \"system:serviceaccount:default:kwatch\" cannot watch resource \"deployments\" in API group \"apps\"",
      "reason": "Forbidden",
      "details": {"group": "apps", "kind": "deployments"},
      "code": 403
    })
}

pub fn status_gone() -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "message": "too old resource version: 1 (1234)",
      "reason": "Expired",
      "code": 410
    })
}

pub fn server_version_info() -> serde_json::Value {
    json!({
        "major": "1",
        "minor": "30",
        "gitVersion": "v1.30.2",
        "gitCommit": "39683505b630ff2121012f3c5b16215a1449d5ed",
        "gitTreeState": "clean",
        "buildDate": "2024-06-11T20:21:00Z",
        "goVersion": "go1.22.4",
        "compiler": "gc",
        "platform": "linux/amd64",
    })
}

pub fn core_api_versions() -> serde_json::Value {
    json!({
        "kind": "APIVersions",
        "apiVersion": "v1",
        "versions": ["v1"],
        "serverAddressByClientCIDRs": [{"clientCIDR": "0.0.0.0/0", "serverAddress": "172.18.0.2:6443"}],
    })
}

pub fn core_v1_discovery() -> serde_json::Value {
    json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": "v1",
        "resources": [
            {
                "name": "configmaps",
                "singularName": "configmap",
                "namespaced": true,
                "kind": "ConfigMap",
                "verbs": ["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames": ["cm"],
            },
            {
                "name": "namespaces",
                "singularName": "namespace",
                "namespaced": false,
                "kind": "Namespace",
                "verbs": ["create","delete","get","list","patch","update","watch"],
                "shortNames": ["ns"],
            },
            {
                "name": "pods",
                "singularName": "pod",
                "namespaced": true,
                "kind": "Pod",
                "verbs": ["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames": ["po"],
                "categories": ["all"],
            },
            {
                "name": "pods/log",
                "singularName": "",
                "namespaced": true,
                "kind": "Pod",
                "verbs": ["get"],
            },
            {
                "name": "bindings",
                "singularName": "binding",
                "namespaced": true,
                "kind": "Binding",
                "verbs": ["create"],
            },
        ],
    })
}

// A group list with one healthy group (apps/v1) and one aggregated group whose backing service
// is down, which is what partial discovery failures look like in a real cluster.
pub fn api_groups() -> serde_json::Value {
    json!({
        "kind": "APIGroupList",
        "apiVersion": "v1",
        "groups": [
            {
                "name": "apps",
                "versions": [{"groupVersion": "apps/v1", "version": "v1"}],
                "preferredVersion": {"groupVersion": "apps/v1", "version": "v1"},
            },
            {
                "name": "metrics.k8s.io",
                "versions": [{"groupVersion": "metrics.k8s.io/v1beta1", "version": "v1beta1"}],
                "preferredVersion": {"groupVersion": "metrics.k8s.io/v1beta1", "version": "v1beta1"},
            },
        ],
    })
}

pub fn apps_v1_discovery() -> serde_json::Value {
    json!({
        "kind":"APIResourceList",
        "apiVersion":"v1",
        "groupVersion":"apps/v1",
        "resources":[
            {
                "name":"daemonsets",
                "singularName":"daemonset",
                "namespaced":true,
                "kind":"DaemonSet",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["ds"],
            },
            {
                "name":"daemonsets/status",
                "singularName":"",
                "namespaced":true,
                "kind":"DaemonSet",
                "verbs":["get","patch","update"],
            },
            {
                "name":"deployments",
                "singularName":"deployment",
                "namespaced":true,
                "kind":"Deployment",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["deploy"],
            },
            {
                "name":"deployments/scale",
                "singularName":"",
                "namespaced":true,
                "group":"autoscaling",
                "version":"v1",
                "kind":"Scale",
                "verbs":["get","patch","update"],
            },
            {
                "name":"statefulsets",
                "singularName":"statefulset",
                "namespaced":true,
                "kind":"StatefulSet",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["sts"],
            },
        ],
    })
}
