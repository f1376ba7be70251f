use chrono::{DateTime, NaiveDate, Utc};
use reqbind::{
    Bind, BindError, Bindable, DecodeOptions, File, Request, Shape, Source, ValidationRule, bind, bind_with,
};
use serde_json::json;
use uuid::Uuid;

#[derive(Bind, Debug, PartialEq)]
struct Address {
    street: String,
    #[bind(validate(regex = "^[0-9]{5}$"))]
    zip: String,
}

#[derive(Bind, Debug, PartialEq)]
#[bind(name = "SignupForm")]
struct Signup {
    #[bind(validate(email))]
    email: String,
    #[bind(rename = "display_name", validate(length(min = 2, max = 20)))]
    name: String,
    #[bind(source = "query", validate(range(min = 1, max = 100)))]
    page: Option<u32>,
    #[bind(source = "Query", optional)]
    verbose: bool,
    #[bind(validate(length(max = 3), each(length(min = 2))))]
    tags: Vec<String>,
    address: Address,
    billing: Option<Box<Address>>,
}

fn signup_request() -> Request {
    Request::builder()
        .form("email", "ada@example.com")
        .form("display_name", "Ada")
        .form_json("tags", json!(["rust", "http"]))
        .form_json("address", json!({"street": "Main", "zip": "12345"}))
        .query("page", "3")
        .build()
}

#[test]
fn binds_a_complete_request() {
    let signup: Signup = bind(&signup_request()).unwrap();
    assert_eq!(
        signup,
        Signup {
            email: "ada@example.com".into(),
            name: "Ada".into(),
            page: Some(3),
            verbose: false,
            tags: vec!["rust".into(), "http".into()],
            address: Address {
                street: "Main".into(),
                zip: "12345".into(),
            },
            billing: None,
        }
    );
}

#[test]
fn descriptor_reflects_attributes() {
    let descriptor = Signup::descriptor("");
    assert_eq!(descriptor.target.name(), "SignupForm");
    let names: Vec<&str> = descriptor
        .children()
        .iter()
        .filter_map(|child| child.lookup_name())
        .collect();
    assert_eq!(
        names,
        vec!["email", "display_name", "page", "verbose", "tags", "address", "billing"]
    );

    let name = descriptor.child("display_name").unwrap();
    assert_eq!(name.real_name, "name");
    assert_eq!(
        name.validations,
        vec![ValidationRule::Length {
            min: Some(2),
            max: Some(20),
        }]
    );

    let page = descriptor.child("page").unwrap();
    assert_eq!(page.source, Source::Query);
    assert!(!page.required);
    assert_eq!(
        page.validations,
        vec![ValidationRule::Range {
            min: Some(1.0),
            max: Some(100.0),
        }]
    );

    let verbose = descriptor.child("verbose").unwrap();
    assert!(!verbose.required);

    let tags = descriptor.child("tags").unwrap();
    assert!(tags.required);
    assert_eq!(tags.element().map(|element| element.validations.len()), Some(1));

    let address = descriptor.child("address").unwrap();
    assert!(matches!(address.shape, Shape::Object(_)));
    assert_eq!(address.children().len(), 2);
}

#[test]
fn reports_every_failure_at_once() {
    let request = Request::builder()
        .form("email", "not-an-email")
        .form_json("tags", json!(["a", "ok"]))
        .form_json("address", json!({"zip": "x"}))
        .query("page", "zero")
        .build();
    let error = bind::<Signup>(&request).unwrap_err();
    assert_eq!(
        error.to_string(),
        concat!(
            r#"[{"email":"value must be a valid email address"},"#,
            r#"{"display_name":"field is required"},"#,
            r#"{"page":"invalid type, expected optional<u32>"},"#,
            r#"{"tags":{"0":"length must be at least 2"}},"#,
            r#"{"address":[{"street":"field is required"},{"zip":"value does not match pattern ^[0-9]{5}$"}]}]"#
        )
    );

    let codes: Vec<String> = error.issues().into_iter().map(|issue| issue.code).collect();
    assert_eq!(
        codes,
        vec![
            "bind.email",
            "bind.required",
            "bind.invalid_type",
            "bind.length",
            "bind.required",
            "bind.regex"
        ]
    );
}

#[test]
fn boxed_optional_objects_bind_when_present() {
    let request = Request::builder()
        .form("email", "ada@example.com")
        .form("display_name", "Ada")
        .form_json("tags", json!([]))
        .form_json("address", json!({"street": "Main", "zip": "12345"}))
        .form_json("billing", json!({"street": "Side", "zip": "54321"}))
        .build();
    let signup: Signup = bind(&request).unwrap();
    assert_eq!(signup.page, None);
    assert_eq!(
        signup.billing,
        Some(Box::new(Address {
            street: "Side".into(),
            zip: "54321".into(),
        }))
    );
}

#[derive(Bind, Debug)]
struct Upload {
    #[bind(source = "path")]
    id: Uuid,
    avatar: File,
    #[bind(optional)]
    attachments: Vec<File>,
    #[bind(source = "headers", rename = "x-sent-at")]
    sent_at: DateTime<Utc>,
    #[bind(source = "query")]
    day: Option<NaiveDate>,
}

#[test]
fn binds_files_and_custom_types() {
    let id = Uuid::new_v4();
    let request = Request::builder()
        .path("id", id.to_string().to_uppercase())
        .file("avatar", File::new("me.png").with_content_type("image/png").with_size(42))
        .header("X-Sent-At", "2024-05-01T12:30:00+02:00")
        .query("day", "2024-05-01")
        .build();
    let upload: Upload = bind(&request).unwrap();
    assert_eq!(upload.id, id);
    assert_eq!(upload.avatar.filename, "me.png");
    assert_eq!(upload.avatar.size, 42);
    assert!(upload.attachments.is_empty());
    assert_eq!(upload.sent_at.to_rfc3339(), "2024-05-01T10:30:00+00:00");
    assert_eq!(upload.day, NaiveDate::from_ymd_opt(2024, 5, 1));
}

#[derive(Bind, Debug, PartialEq)]
struct Credentials {
    #[bind(source = "auth")]
    username: String,
    #[bind(source = "auth")]
    password: String,
}

#[test]
fn binds_basic_auth_credentials() {
    let request = Request::builder().basic_auth("ada", "hunter2").build();
    let credentials: Credentials = bind(&request).unwrap();
    assert_eq!(credentials.username, "ada");
    assert_eq!(credentials.password, "hunter2");

    let error = bind::<Credentials>(&Request::default()).unwrap_err();
    assert_eq!(
        error,
        BindError::List(vec![
            BindError::Missing {
                field: "username".into()
            },
            BindError::Missing {
                field: "password".into()
            },
        ])
    );
}

#[derive(Bind, Debug, PartialEq)]
struct Search {
    #[bind(source = "query", validate(each(one_of(allowed = ["new", "hot"], case_insensitive))))]
    sort: Vec<String>,
}

#[test]
fn options_change_list_and_text_handling() {
    let request = Request::builder().query("sort", "new, HOT").build();
    let options = DecodeOptions::default().with_list_separator(',').trimmed();
    let search: Search = bind_with(&request, &options).unwrap();
    assert_eq!(search.sort, vec!["new".to_string(), "HOT".to_string()]);

    let request = Request::builder().query("sort", "new").query("sort", "old").build();
    let error = bind::<Search>(&request).unwrap_err();
    assert_eq!(
        error.to_string(),
        r#"{"sort":{"1":"value must be one of [\"new\", \"hot\"]"}}"#
    );
}
