use serde::{Deserialize, Serialize};

use crate::models::{Article, Comment, User};

// -- Forms --

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Used by both `/post` and `/edit/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleForm {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

// -- Pages --

/// Every page carries the pending flash message and the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub flash: Option<String>,
    pub current_user: Option<User>,
    #[serde(flatten)]
    pub content: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleList {
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub article: Article,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentList {
    pub comments: Vec<Comment>,
}

/// A form page. `article` is set when editing an existing article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormView {
    pub form: FormKind,
    pub article: Option<Article>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Register,
    Login,
    Article,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_content_is_flattened() {
        let page = Page {
            flash: Some("Posted".into()),
            current_user: None,
            content: FormView {
                form: FormKind::Login,
                article: None,
            },
        };

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["flash"], "Posted");
        assert_eq!(json["form"], "login");
        assert!(json["current_user"].is_null());
    }
}
