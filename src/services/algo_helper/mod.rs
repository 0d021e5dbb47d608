pub mod activation;
pub mod encoder;
pub mod helpers;
pub mod perceptron;
