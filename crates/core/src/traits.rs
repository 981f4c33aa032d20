/// Projects text into a fixed vector space. Terms outside the space are dropped.
pub trait Vectorizer {
    fn dimensions(&self) -> usize;
    fn vectorize(&self, text: &str) -> Vec<f64>;
}
