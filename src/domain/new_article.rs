use crate::routes::ArticleData;

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug)]
pub struct NewArticle {
    pub title: String,
    pub body: String,
    pub keywords: String,
}

impl TryFrom<ArticleData> for NewArticle {
    type Error = String;

    fn try_from(value: ArticleData) -> Result<Self, Self::Error> {
        if value.title.trim().is_empty() {
            return Err("An article title must not be empty.".into());
        }
        if value.title.chars().count() > MAX_TITLE_CHARS {
            return Err("An article title must not exceed 200 characters.".into());
        }
        if value.body.trim().is_empty() {
            return Err("An article body must not be empty.".into());
        }
        Ok(Self {
            title: value.title,
            body: value.body,
            keywords: value.keywords,
        })
    }
}
